//! Positional field extraction from device HTML pages.
//!
//! Each page layout is described by a [`FieldTable`]: one tag kind and the
//! zero-based positions of the elements holding each value. A markup change on
//! the device shifts every index, so the tables are the contract.

mod pon;

pub use pon::*;

#[cfg(test)]
pub(crate) use pon::fixtures;

use scraper::{Html, Selector};
use thiserror::Error;

/// Extraction error types.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("found {found} <{tag}> elements, layout requires at least {required}")]
    TooFewElements {
        tag: &'static str,
        found: usize,
        required: usize,
    },
    #[error("invalid selector: {0}")]
    Selector(String),
}

/// One value on a page: where it sits and which series it feeds.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub index: usize,
    pub name: &'static str,
    pub help: &'static str,
}

/// Index table for one page layout.
#[derive(Debug)]
pub struct FieldTable<const N: usize> {
    pub tag: &'static str,
    pub fields: [Field; N],
}

impl<const N: usize> FieldTable<N> {
    /// Smallest element count that covers every index in the table.
    pub fn min_elements(&self) -> usize {
        self.fields.iter().map(|f| f.index + 1).max().unwrap_or(0)
    }

    /// Pull every field out of `html`, in table order.
    pub fn extract(&self, html: &str) -> Result<[f64; N], ExtractError> {
        let selector =
            Selector::parse(self.tag).map_err(|e| ExtractError::Selector(format!("{:?}", e)))?;
        let document = Html::parse_document(html);
        let texts: Vec<String> = document
            .select(&selector)
            .map(|element| element.text().collect())
            .collect();

        let required = self.min_elements();
        if texts.len() < required {
            return Err(ExtractError::TooFewElements {
                tag: self.tag,
                found: texts.len(),
                required,
            });
        }

        Ok(self.fields.map(|field| parse_leading_number(&texts[field.index])))
    }
}

/// Parse the first whitespace-separated token as a float.
///
/// Anything after the first token (usually a unit) is dropped. Unparseable
/// text yields zero.
pub fn parse_leading_number(text: &str) -> f64 {
    text.split_whitespace()
        .next()
        .and_then(|token| token.parse().ok())
        .unwrap_or(0.0)
}
