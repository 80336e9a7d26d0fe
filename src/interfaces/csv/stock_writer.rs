use crate::domain::product::StockedProduct;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct StockRow<'a> {
    sku: &'a str,
    name: &'a str,
    quantity: u32,
    sold_out: bool,
}

/// Writes a stock report as CSV (`sku,name,quantity,sold_out`).
pub struct StockWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> StockWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_stock(&mut self, products: &[StockedProduct]) -> Result<()> {
        for stock in products {
            self.writer.serialize(StockRow {
                sku: stock.sku().as_str(),
                name: &stock.product.name,
                quantity: stock.available(),
                sold_out: stock.product.sold_out,
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
