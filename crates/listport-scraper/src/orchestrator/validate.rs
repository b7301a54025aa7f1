use listport_core::ScrapedProduct;

use crate::error::ScraperError;

/// What a structurally valid product still needs before it can be returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Readiness {
    Ready,
    NeedsVision,
}

/// Checks the invariants every returned product must hold.
///
/// A product with images but no title is valid and routed to vision repair.
pub(crate) fn validate_product(product: &ScrapedProduct) -> Result<Readiness, ScraperError> {
    let mut reasons = Vec::new();
    if product.images.is_empty() {
        reasons.push("Missing images");
    }
    if !product.price.is_finite() || product.price < 0.0 {
        reasons.push("Invalid price");
    }
    if !reasons.is_empty() {
        return Err(ScraperError::InvalidProduct {
            reasons: reasons.join(", "),
        });
    }

    if product.has_title() {
        Ok(Readiness::Ready)
    } else {
        Ok(Readiness::NeedsVision)
    }
}
