mod cli;
mod evaluator;
mod pipeline;
