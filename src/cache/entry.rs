use std::io::{Read, Write};

use chrono::{DateTime, Duration, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{self, AddContext};
use crate::http::{Headers, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use crate::io::Response;
use crate::time::{self, Seconds};
use crate::Result;

const MAGIC: &[u8; 3] = b"hpc";
const FORMAT_VERSION: u8 = 1;

// Upper bound for a single header name or value. Anything larger is a
// corrupt length prefix, not a real header.
const MAX_HEADER_FIELD_LEN: u32 = 1 << 20;

/// Largest delta-seconds value honoured, per RFC 7234 section 1.2.1.
pub const MAX_DELTA_SECONDS: i64 = 2_147_483_648;

/// Immutable snapshot of a cacheable response together with the instant it
/// stops being fresh.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry {
    status: u16,
    headers: Headers,
    body: Vec<u8>,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(response: &Response, expires_at: DateTime<Utc>) -> Self {
        CacheEntry {
            status: response.status,
            headers: response.headers.clone(),
            body: response.body.clone(),
            expires_at,
        }
    }

    /// Entry that expires `ttl` seconds after `now`. A negative `ttl` gives
    /// an entry that is already stale. `ttl` is clamped to
    /// [`MAX_DELTA_SECONDS`] in both directions.
    pub fn with_ttl(response: &Response, now: DateTime<Utc>, ttl: i64) -> Self {
        let ttl = ttl.clamp(-MAX_DELTA_SECONDS, MAX_DELTA_SECONDS);
        CacheEntry::new(response, now + Duration::seconds(ttl))
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_fresh(&self, now: &DateTime<Utc>) -> bool {
        *now < self.expires_at
    }

    pub fn is_stale(&self, now: &DateTime<Utc>) -> bool {
        !self.is_fresh(now)
    }

    /// Seconds of freshness left.
    pub fn ttl(&self, now: &DateTime<Utc>) -> Seconds {
        time::seconds_until(now, &self.expires_at)
    }

    pub fn etag(&self) -> Option<&str> {
        self.headers.get(ETAG)
    }

    pub fn last_modified(&self) -> Option<&str> {
        self.headers.get(LAST_MODIFIED)
    }

    /// True when the entry can be revalidated with the origin.
    pub fn has_validation_information(&self) -> bool {
        self.etag().is_some() || self.last_modified().is_some()
    }

    /// Request headers that turn a refetch into a conditional request.
    pub fn conditional_headers(&self) -> Headers {
        let mut headers = Headers::new();
        if let Some(etag) = self.etag() {
            headers.set(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = self.last_modified() {
            headers.set(IF_MODIFIED_SINCE, last_modified);
        }
        headers
    }

    pub fn to_response(&self) -> Response {
        Response {
            status: self.status,
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }

    /// Serialize into the versioned on-disk format: magic, version byte and
    /// a gzip stream of big-endian, length-prefixed fields.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(MAGIC.len() + 1);
        data.extend_from_slice(MAGIC);
        data.push(FORMAT_VERSION);
        let mut encoder = GzEncoder::new(data, Compression::default());
        encoder.write_all(&self.status.to_be_bytes())?;
        encoder.write_all(&self.expires_at.timestamp().to_be_bytes())?;
        encoder.write_all(&self.expires_at.timestamp_subsec_nanos().to_be_bytes())?;
        encoder.write_all(&(self.headers.len() as u32).to_be_bytes())?;
        for (name, value) in self.headers.iter() {
            write_field(&mut encoder, name.as_bytes())?;
            write_field(&mut encoder, value.as_bytes())?;
        }
        encoder.write_all(&(self.body.len() as u64).to_be_bytes())?;
        encoder.write_all(&self.body)?;
        Ok(encoder.finish()?)
    }

    pub fn decode(data: &[u8]) -> Result<CacheEntry> {
        let Some(payload) = data.strip_prefix(MAGIC.as_slice()) else {
            return Err(error::corrupt("missing cache entry header"));
        };
        let Some((&version, payload)) = payload.split_first() else {
            return Err(error::corrupt("missing cache entry format version"));
        };
        if version != FORMAT_VERSION {
            return Err(error::corrupt(format!(
                "unsupported cache entry format version {version}"
            )));
        }
        let mut reader = GzDecoder::new(payload);
        let status = u16::from_be_bytes(read_array(&mut reader)?);
        let seconds = i64::from_be_bytes(read_array(&mut reader)?);
        let nanos = u32::from_be_bytes(read_array(&mut reader)?);
        let expires_at = DateTime::from_timestamp(seconds, nanos)
            .ok_or_else(|| error::corrupt(format!("invalid expiration {seconds}.{nanos}")))?;
        let header_count = u32::from_be_bytes(read_array(&mut reader)?);
        let mut headers = Headers::new();
        for _ in 0..header_count {
            let name = read_string(&mut reader).err_context("reading header name")?;
            let value = read_string(&mut reader).err_context("reading header value")?;
            headers.append(name, value);
        }
        let body_len = u64::from_be_bytes(read_array(&mut reader)?);
        let body = read_exact_len(&mut reader, body_len)?;
        let mut trailing = [0u8; 1];
        if reader.read(&mut trailing)? != 0 {
            return Err(error::corrupt("trailing data after cache entry"));
        }
        Ok(CacheEntry {
            status,
            headers,
            body,
            expires_at,
        })
    }
}

fn write_field<W: Write>(writer: &mut W, field: &[u8]) -> Result<()> {
    writer.write_all(&(field.len() as u32).to_be_bytes())?;
    writer.write_all(field)?;
    Ok(())
}

fn read_array<R: Read, const N: usize>(reader: &mut R) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader
        .read_exact(&mut buf)
        .map_err(|err| error::corrupt(format!("truncated cache entry: {err}")))?;
    Ok(buf)
}

// Reads through `take` so a bogus length prefix cannot force a huge
// allocation up front.
fn read_exact_len<R: Read>(reader: &mut R, len: u64) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.take(len).read_to_end(&mut buf)?;
    if buf.len() as u64 != len {
        return Err(error::corrupt(format!(
            "truncated cache entry: expected {len} bytes, got {}",
            buf.len()
        )));
    }
    Ok(buf)
}

fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let len = u32::from_be_bytes(read_array(reader)?);
    if len > MAX_HEADER_FIELD_LEN {
        return Err(error::corrupt(format!("header field too long: {len}")));
    }
    let bytes = read_exact_len(reader, len as u64)?;
    String::from_utf8(bytes).map_err(|err| error::corrupt(err.to_string()))
}
