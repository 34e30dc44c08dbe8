//! GitHub API quota tracking.
//!
//! Every API response carries `X-RateLimit-*` headers; the latest values are kept
//! and consulted before each issue is processed.

use std::time::Duration;

use jiff::Timestamp;
use reqwest::header::HeaderMap;
use serde::Deserialize;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
pub struct RateLimit {
	pub limit: u32,
	pub remaining: u32,
	/// Start of the next rate window.
	#[serde(with = "epoch_seconds")]
	pub reset: Timestamp,
}

impl RateLimit {
	/// Parse quota state from response headers. Returns None if any of the three headers is missing or garbled.
	pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
		fn header<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
			headers.get(name)?.to_str().ok()?.trim().parse().ok()
		}

		let limit = header(headers, "x-ratelimit-limit")?;
		let remaining = header(headers, "x-ratelimit-remaining")?;
		let reset_epoch: i64 = header(headers, "x-ratelimit-reset")?;
		let reset = Timestamp::from_second(reset_epoch).ok()?;

		Some(Self { limit, remaining, reset })
	}

	/// How long to block before continuing, given the current time.
	///
	/// None while at least `threshold` calls remain, or once the reset instant is already behind us.
	/// Otherwise waits until one second past the reset, so the new window is guaranteed to be open.
	pub fn wait_duration(&self, threshold: u32, now: Timestamp) -> Option<Duration> {
		if self.remaining >= threshold {
			return None;
		}
		let secs = self.reset.as_second() - now.as_second();
		if secs < 0 {
			return None;
		}
		Some(Duration::from_secs(secs as u64 + 1))
	}
}

mod epoch_seconds {
	use jiff::Timestamp;
	use serde::{Deserialize, Deserializer, de::Error as _};

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
		let secs = i64::deserialize(deserializer)?;
		Timestamp::from_second(secs).map_err(D::Error::custom)
	}
}
