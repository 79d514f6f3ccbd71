mod cli;
mod export;
mod import;
mod utils;
