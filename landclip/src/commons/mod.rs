pub mod basic_functions;
