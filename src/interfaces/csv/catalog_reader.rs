use crate::domain::product::CatalogEntry;
use crate::error::{Result, ShopError};
use std::io::Read;

/// Reads catalog rows (`sku,name,net_price,quantity,category`) from a CSV
/// source.
///
/// This reader wraps `csv::Reader` and provides an iterator over
/// `Result<CatalogEntry>`. It handles whitespace trimming and flexible record
/// lengths, so the trailing `category` column may be left out.
pub struct CatalogReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CatalogReader<R> {
    /// Creates a new `CatalogReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads, deserializes and validates rows.
    ///
    /// A bad row yields an `Err` item; reading continues with the next row.
    pub fn entries(self) -> impl Iterator<Item = Result<CatalogEntry>> {
        self.reader.into_deserialize().map(|result| {
            result
                .map_err(ShopError::from)
                .and_then(CatalogEntry::validate)
        })
    }
}
