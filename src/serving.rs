//! Serving resource kinds built on the condition and duck machinery.

pub mod v1alpha1;

use crate::{Result, scheme::Scheme};

/// Scheme with every serving kind this crate defines.
pub fn scheme() -> Result<Scheme> {
    Scheme::builder()
        .register::<v1alpha1::DomainMapping>()
        .build()
}
