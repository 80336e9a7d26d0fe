pub mod catalog_reader;
pub mod stock_writer;
