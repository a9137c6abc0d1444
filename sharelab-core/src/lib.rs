//! ShareLab Core: price domain types, query validation, cache, providers, indicators.
//!
//! This crate holds everything the retrieval service composes:
//! - Domain types (`PriceRecord`, validated `Query`)
//! - In-memory `PriceCache` with insert-if-absent merge and age-based eviction
//! - `PriceProvider` trait with synthetic, offline and circuit-breaker implementations
//! - Moving average over closing prices

pub mod data;
pub mod domain;
pub mod indicators;
