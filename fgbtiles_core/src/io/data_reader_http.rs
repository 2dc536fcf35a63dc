//! This module provides a byte-range reader over an HTTP(S) endpoint.
//!
//! Ranges are fetched with the HTTP `Range` header. The server must answer
//! `206 Partial Content` with a `content-range` header starting at the
//! requested offset; a response that ends early is accepted, matching the
//! clamp-at-end-of-resource contract of [`DataReaderTrait`].

use super::DataReaderTrait;
use crate::{Blob, ByteRange};
use anyhow::{Context, Result, anyhow, bail, ensure};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use reqwest::{Client, Method, Request, StatusCode, Url};
use std::time::Duration;

/// A byte-range reader over an HTTP(S) endpoint.
#[derive(Debug)]
pub struct DataReaderHttp {
	client: Client,
	name: String,
	url: Url,
}

impl DataReaderHttp {
	/// Creates a reader for an `http` or `https` URL.
	pub fn from_url(url: Url) -> Result<Box<DataReaderHttp>> {
		match url.scheme() {
			"http" | "https" => (),
			_ => bail!("url has wrong scheme {url}"),
		}

		let client = Client::builder()
			.tcp_keepalive(Duration::from_secs(600))
			.build()
			.context("failed to build HTTP client")?;

		Ok(Box::new(DataReaderHttp {
			client,
			name: url.to_string(),
			url,
		}))
	}
}

/// Parses a `content-range` header of the form `bytes <start>-<end>/<size>`.
fn parse_content_range(value: &str) -> Result<(u64, u64)> {
	lazy_static! {
		static ref RE_CONTENT_RANGE: Regex = RegexBuilder::new(r"^bytes (\d+)-(\d+)/\d+$")
			.case_insensitive(true)
			.build()
			.unwrap();
	}

	let caps = RE_CONTENT_RANGE
		.captures(value)
		.ok_or_else(|| anyhow!("invalid content-range header: {value}"))?;
	Ok((
		caps[1]
			.parse::<u64>()
			.with_context(|| format!("invalid content-range start in '{value}'"))?,
		caps[2]
			.parse::<u64>()
			.with_context(|| format!("invalid content-range end in '{value}'"))?,
	))
}

#[async_trait]
impl DataReaderTrait for DataReaderHttp {
	async fn read_range(&self, range: &ByteRange) -> Result<Blob> {
		let ctx = || format!("while reading range {range} of {}", self.url);

		let mut request = Request::new(Method::GET, self.url.clone());
		let request_range = format!("bytes={}-{}", range.offset, range.end() - 1);
		request
			.headers_mut()
			.append("range", request_range.parse().with_context(ctx)?);

		let response = self.client.execute(request).await.with_context(ctx)?;

		if response.status() != StatusCode::PARTIAL_CONTENT {
			bail!(
				"expected 206 as a response to a range request, got {}, {}",
				response.status(),
				ctx()
			);
		}

		let content_range = response
			.headers()
			.get("content-range")
			.ok_or_else(|| anyhow!("content-range header is not set in response, {}", ctx()))?
			.to_str()
			.with_context(ctx)?;

		let (start, end) = parse_content_range(content_range).with_context(ctx)?;
		ensure!(
			start == range.offset,
			"content-range start {start} does not match requested offset, {}",
			ctx()
		);
		ensure!(
			end <= range.end() - 1,
			"content-range end {end} exceeds the requested range, {}",
			ctx()
		);

		let bytes = response.bytes().await.with_context(ctx)?;
		Ok(Blob::from(&*bytes))
	}

	async fn read_all(&self) -> Result<Blob> {
		let ctx = || format!("while reading all data from {}", self.url);
		let response = self.client.get(self.url.clone()).send().await.with_context(ctx)?;
		if !response.status().is_success() {
			bail!("expected successful response, got {}, {}", response.status(), ctx());
		}
		let bytes = response.bytes().await.with_context(ctx)?;
		Ok(Blob::from(&*bytes))
	}

	fn get_name(&self) -> &str {
		&self.name
	}
}
