//! Catalog: reference data consumed by the ledger, engine and scanner.
//!
//! Supplies, categories, suppliers, locations, operatories and procedure
//! templates. Quantities are **not** held here; the stock ledger owns them.

pub mod catalog;
pub mod config;
pub mod model;

pub use catalog::Catalog;
pub use config::CatalogConfig;
pub use model::{
    Category, ContactInfo, Location, Operatory, Procedure, ProcedureSupply, Supplier, SupplierDraft,
    Supply, SupplyDraft, SupplyUpdate, Unit,
};
