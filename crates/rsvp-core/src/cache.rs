//! Token stream cache: one metadata entry plus fixed-size compressed pages.
//!
//! The stream is logically one array. Pages only bound the memory needed per
//! write and per read; [`load_stream`] reassembles them and checks that the
//! result is exactly what [`save_stream`] wrote.

use core::fmt::Display;

use log::{debug, info};
use miniz_oxide::{deflate::compress_to_vec_zlib, inflate::decompress_to_vec_zlib_with_limit};
use serde::{Deserialize, Serialize};

use crate::{error::RsvpError, token::Token};

pub const TOKEN_PAGE_SIZE: usize = 1_000;
pub const CACHE_STALE_AFTER_MS: u64 = 30 * 24 * 60 * 60 * 1_000;
/// Inflated size ceiling for a single token page.
pub const MAX_PAGE_INFLATED_BYTES: usize = 8 * 1024 * 1024;
pub const MAX_CACHED_TOKENS: u32 = 2_000_000;

const COMPRESSION_LEVEL: u8 = 6;

/// `extracted_text_cache` row.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub doc_id: String,
    pub total_tokens: u32,
    pub total_pages: u32,
    /// Unix epoch milliseconds of the write.
    pub cache_date: u64,
    pub file_hash: String,
    /// Number of token pages stored alongside this entry.
    pub page_count: u32,
}

impl CacheEntry {
    pub fn is_stale(&self, now_unix_ms: u64) -> bool {
        now_unix_ms.saturating_sub(self.cache_date) > CACHE_STALE_AFTER_MS
    }

    pub fn expected_page_count(&self) -> u32 {
        (self.total_tokens as usize).div_ceil(TOKEN_PAGE_SIZE) as u32
    }
}

/// Abstract cache backend: metadata rows plus opaque page blobs.
pub trait CacheStore {
    type Error: Display;

    fn load_entry(&mut self, doc_id: &str) -> Result<Option<CacheEntry>, Self::Error>;
    fn load_page(&mut self, doc_id: &str, page: u32) -> Result<Option<Vec<u8>>, Self::Error>;
    /// Replace the entry and all of its pages in one write.
    fn store_entry(&mut self, entry: &CacheEntry, pages: &[Vec<u8>]) -> Result<(), Self::Error>;
    fn remove_entry(&mut self, doc_id: &str) -> Result<(), Self::Error>;
}

pub fn encode_page(tokens: &[Token]) -> Result<Vec<u8>, RsvpError> {
    let json = serde_json::to_vec(tokens)
        .map_err(|err| RsvpError::Storage(format!("token page encode failed: {err}")))?;
    Ok(compress_to_vec_zlib(&json, COMPRESSION_LEVEL))
}

pub fn decode_page(bytes: &[u8]) -> Result<Vec<Token>, RsvpError> {
    let json = decompress_to_vec_zlib_with_limit(bytes, MAX_PAGE_INFLATED_BYTES).map_err(|err| {
        RsvpError::CacheCorruption(format!("token page inflate failed status={:?}", err.status))
    })?;
    serde_json::from_slice(&json)
        .map_err(|err| RsvpError::CacheCorruption(format!("token page parse failed: {err}")))
}

/// Writes `tokens` as a fresh cache entry, replacing any previous one.
pub fn save_stream<C: CacheStore>(
    cache: &mut C,
    doc_id: &str,
    tokens: &[Token],
    total_pages: u32,
    file_hash: &str,
    now_unix_ms: u64,
) -> Result<CacheEntry, RsvpError> {
    if tokens.len() > MAX_CACHED_TOKENS as usize {
        return Err(RsvpError::Storage(format!(
            "stream too large to cache tokens={}",
            tokens.len()
        )));
    }

    let pages = tokens
        .chunks(TOKEN_PAGE_SIZE)
        .map(encode_page)
        .collect::<Result<Vec<_>, _>>()?;

    let entry = CacheEntry {
        doc_id: doc_id.to_owned(),
        total_tokens: tokens.len() as u32,
        total_pages,
        cache_date: now_unix_ms,
        file_hash: file_hash.to_owned(),
        page_count: pages.len() as u32,
    };

    cache.store_entry(&entry, &pages).map_err(RsvpError::storage)?;
    info!(
        "cache: stored doc={} tokens={} pages={} bytes={}",
        doc_id,
        entry.total_tokens,
        entry.page_count,
        pages.iter().map(Vec::len).sum::<usize>()
    );
    Ok(entry)
}

/// Reassembles the stream described by `entry`.
///
/// Backend failures come back as `Storage`; anything wrong with the stored
/// data itself comes back as `CacheCorruption`.
pub fn load_stream<C: CacheStore>(cache: &mut C, entry: &CacheEntry) -> Result<Vec<Token>, RsvpError> {
    if entry.total_tokens > MAX_CACHED_TOKENS {
        return Err(RsvpError::CacheCorruption(format!(
            "entry claims too many tokens total={}",
            entry.total_tokens
        )));
    }
    if entry.page_count != entry.expected_page_count() {
        return Err(RsvpError::CacheCorruption(format!(
            "page count mismatch stored={} expected={}",
            entry.page_count,
            entry.expected_page_count()
        )));
    }

    let mut tokens = Vec::with_capacity(entry.total_tokens as usize);
    for page in 0..entry.page_count {
        let Some(bytes) = cache
            .load_page(&entry.doc_id, page)
            .map_err(RsvpError::storage)?
        else {
            return Err(RsvpError::CacheCorruption(format!("missing token page {page}")));
        };

        let decoded = decode_page(&bytes)?;
        if tokens.len() + decoded.len() > entry.total_tokens as usize {
            return Err(RsvpError::CacheCorruption(format!(
                "token page {page} overflows the stream"
            )));
        }
        if let Some(bad) = decoded.iter().find(|token| !token.is_consistent()) {
            return Err(RsvpError::CacheCorruption(format!(
                "inconsistent token id={}",
                bad.id
            )));
        }
        debug!("cache: page loaded doc={} page={} tokens={}", entry.doc_id, page, decoded.len());
        tokens.extend(decoded);
    }

    if tokens.len() != entry.total_tokens as usize {
        return Err(RsvpError::CacheCorruption(format!(
            "stream length mismatch loaded={} expected={}",
            tokens.len(),
            entry.total_tokens
        )));
    }

    Ok(tokens)
}
