// src/ingest/extract/mod.rs
//! Per-source-type extractors. Each converts one raw wire format into
//! `NormalizedItem`s; nothing here touches the store.

pub mod polymarket;
pub mod rss;
pub mod youtube;
