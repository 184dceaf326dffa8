//! # remedy-db: Persistence & Orchestration for Remedy POS
//!
//! Everything stateful lives here: the SQLite-backed record store, typed
//! repositories over it, and the terminal service that drives checkout and
//! returns against remedy-core's pure rules.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Remedy POS Data Flow                              │
//! │                                                                         │
//! │  Terminal frontend (checkout, returns desk)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     remedy-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │   Terminal   │  │   │
//! │  │   │   (pool.rs)   │    │  batch/sale/  │    │   Service    │  │   │
//! │  │   │               │    │  shift        │    │ (service.rs) │  │   │
//! │  │   │ SqlitePool    │◄───│ records table │◄───│ shift lock + │  │   │
//! │  │   │ Migrations    │    │ JSON payloads │    │ atomic commit│  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (records table: serialized domain records by key)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`pool`] - database handle, pool configuration
//! - [`migrations`] - embedded schema migrations
//! - [`error`] - persistence error types
//! - [`repository`] - batch / sale / shift repositories
//! - [`service`] - checkout and return orchestration under the shift lock
//!
//! ## Usage
//!
//! ```rust,ignore
//! use remedy_db::{Database, DbConfig, TerminalService};
//!
//! let db = Database::new(DbConfig::new("path/to/remedy.db")).await?;
//! let service = TerminalService::new(db);
//!
//! let sale = service.checkout(&mut cart, &operator, PaymentMethod::Cash).await?;
//! let ret = service
//!     .process_return(&sale.id, &selections, "damaged packaging", None, &operator)
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::DbError;
pub use pool::{Database, DbConfig};
pub use service::{ServiceError, TerminalService};

// Repository re-exports for convenience
pub use repository::batch::BatchRepository;
pub use repository::sale::SaleRepository;
pub use repository::shift::ShiftRepository;
