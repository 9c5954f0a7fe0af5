use log::{info, warn};

use super::{LoadRequest, LoadedStream};
use crate::{
    cache::{self, CacheEntry, CacheStore},
    error::RsvpError,
    extract::{Extractor, validate_token_stream},
    token::Token,
    tokenizer::generate_token_stream,
};

/// A cached stream whose first token sits past this page is suspicious
/// unless the caller asked for a start page.
const PLAUSIBLE_FIRST_PAGE_FLOOR: u32 = 3;

/// Produces the token stream for `request`, from the cache when it is still
/// valid, otherwise by running `extractor` and warming the cache.
///
/// Blocking and possibly slow; hosts run it off the tick loop.
pub fn load_token_stream<E, C>(
    extractor: &mut E,
    cache: &mut C,
    request: &LoadRequest,
    now_unix_ms: u64,
) -> Result<LoadedStream, RsvpError>
where
    E: Extractor,
    C: CacheStore,
{
    let file_hash = extractor
        .content_hash()
        .map_err(|err| RsvpError::Extraction(err.to_string()))?;

    if let Some(stream) = load_cached(cache, request, &file_hash, now_unix_ms) {
        return Ok(stream);
    }

    let document = extractor
        .extract()
        .map_err(|err| RsvpError::Extraction(err.to_string()))?;
    document.validate()?;

    let tokens = generate_token_stream(&document.pages, &request.doc_id);
    validate_token_stream(&tokens)?;
    info!(
        "extract: tokenized doc={} pages={} tokens={}",
        request.doc_id,
        document.total_pages,
        tokens.len()
    );

    if let Err(err) = cache::save_stream(
        cache,
        &request.doc_id,
        &tokens,
        document.total_pages,
        &file_hash,
        now_unix_ms,
    ) {
        warn!("cache: store failed doc={} err={}", request.doc_id, err);
    }

    Ok(LoadedStream {
        tokens,
        total_pages: document.total_pages,
        file_hash,
        from_cache: false,
    })
}

fn load_cached<C: CacheStore>(
    cache: &mut C,
    request: &LoadRequest,
    file_hash: &str,
    now_unix_ms: u64,
) -> Option<LoadedStream> {
    let entry = match cache.load_entry(&request.doc_id) {
        Ok(Some(entry)) => entry,
        Ok(None) => {
            info!("cache: miss doc={} reason=absent", request.doc_id);
            return None;
        }
        Err(err) => {
            warn!("cache: miss doc={} reason=read_failed err={}", request.doc_id, err);
            return None;
        }
    };

    if entry.file_hash != file_hash {
        info!("cache: miss doc={} reason=hash_changed", request.doc_id);
        return None;
    }
    if entry.is_stale(now_unix_ms) {
        info!(
            "cache: miss doc={} reason=stale cache_date={}",
            request.doc_id, entry.cache_date
        );
        return None;
    }

    let tokens = match cache::load_stream(cache, &entry) {
        Ok(tokens) => tokens,
        Err(RsvpError::CacheCorruption(reason)) => {
            warn!(
                "cache: corrupted doc={} reason={}, dropping entry",
                request.doc_id, reason
            );
            if let Err(err) = cache.remove_entry(&request.doc_id) {
                warn!("cache: remove failed doc={} err={}", request.doc_id, err);
            }
            return None;
        }
        Err(err) => {
            warn!("cache: miss doc={} reason=read_failed err={}", request.doc_id, err);
            return None;
        }
    };

    if request.start_page.is_none() && !plausible_start(&tokens, &entry) {
        warn!(
            "cache: miss doc={} reason=implausible_first_page page={}",
            request.doc_id,
            tokens.first().map_or(0, Token::page_num)
        );
        return None;
    }

    info!(
        "cache: hit doc={} tokens={} pages={}",
        request.doc_id, entry.total_tokens, entry.total_pages
    );
    Some(LoadedStream {
        tokens,
        total_pages: entry.total_pages,
        file_hash: entry.file_hash,
        from_cache: true,
    })
}

fn plausible_start(tokens: &[Token], entry: &CacheEntry) -> bool {
    let Some(first) = tokens.first() else {
        return false;
    };
    first.page_num() <= PLAUSIBLE_FIRST_PAGE_FLOOR.max(entry.total_pages / 2)
}
