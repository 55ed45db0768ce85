use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::{NsReader, Reader};
use std::fmt::Display;
use tracing::{debug, instrument};

use crate::core::config::ECB_DAILY_URL;
use crate::core::currency::RateFeed;
use crate::core::error::RateError;

const USER_AGENT: &str = concat!("eurofx/", env!("CARGO_PKG_VERSION"));

/// Element name repeated at each level of the rate path.
const CUBE: &[u8] = b"Cube";

/// Depth of the rate leaves below the document root.
const LEAF_DEPTH: usize = 3;

fn malformed<E: Display>(err: E) -> RateError {
    RateError::MalformedFeed(err.to_string())
}

/// Returns the URI of the first default namespace declared in the document.
///
/// When several default namespaces are declared the first one in document
/// order wins. The daily feed declares exactly one, on the root element.
fn discover_default_namespace(xml: &str) -> Result<String, RateError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) | Event::Empty(e) => {
                for attr in e.attributes() {
                    let attr = attr.map_err(malformed)?;
                    if attr.key.as_ref() == b"xmlns" {
                        return Ok(attr.unescape_value().map_err(malformed)?.into_owned());
                    }
                }
            }
            Event::Eof => {
                return Err(RateError::MalformedFeed(
                    "No default namespace declared".to_string(),
                ));
            }
            _ => {}
        }
    }
}

fn is_cube(ns: &ResolveResult, e: &BytesStart, namespace: &str) -> bool {
    matches!(ns, ResolveResult::Bound(Namespace(uri)) if *uri == namespace.as_bytes())
        && e.local_name().as_ref() == CUBE
}

fn required_attribute(e: &BytesStart, name: &str) -> Result<String, RateError> {
    let attr = e
        .try_get_attribute(name)
        .map_err(malformed)?
        .ok_or_else(|| RateError::MalformedFeed(format!("Missing '{name}' attribute")))?;
    Ok(attr.unescape_value().map_err(malformed)?.into_owned())
}

fn read_leaf(e: &BytesStart) -> Result<(String, f64), RateError> {
    let currency = required_attribute(e, "currency")?;
    let raw_rate = required_attribute(e, "rate")?;
    let rate = raw_rate
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|r| r.is_finite() && *r > 0.0)
        .ok_or_else(|| {
            RateError::MalformedFeed(format!("Invalid rate '{raw_rate}' for {currency}"))
        })?;
    Ok((currency, rate))
}

/// Parses an ECB reference-rate document.
///
/// Leaves are the elements at root -> Cube -> Cube -> Cube, where every `Cube`
/// is in the document's default namespace. The namespace URI is read from the
/// document rather than assumed.
pub fn parse_feed(xml: &str) -> Result<Vec<(String, f64)>, RateError> {
    let namespace = discover_default_namespace(xml)?;
    debug!("Discovered feed namespace {}", namespace);

    let mut reader = NsReader::from_str(xml);
    // One entry per open element: whether it continues the Cube path.
    let mut path: Vec<bool> = Vec::new();
    let mut entries = Vec::new();
    let mut root_closed = false;

    loop {
        let (ns, event) = reader.read_resolved_event().map_err(malformed)?;
        match event {
            Event::Start(_) | Event::Empty(_) if root_closed => {
                return Err(RateError::MalformedFeed(
                    "Content after the root element".to_string(),
                ));
            }
            Event::Start(e) => {
                let on_path =
                    path.iter().all(|p| *p) && (path.is_empty() || is_cube(&ns, &e, &namespace));
                if on_path && path.len() == LEAF_DEPTH {
                    entries.push(read_leaf(&e)?);
                }
                path.push(on_path);
            }
            Event::Empty(e) => {
                let on_path = path.iter().all(|p| *p) && is_cube(&ns, &e, &namespace);
                if on_path && path.len() == LEAF_DEPTH {
                    entries.push(read_leaf(&e)?);
                }
                root_closed = path.is_empty();
            }
            Event::End(_) => {
                path.pop();
                root_closed = path.is_empty();
            }
            Event::Eof if !path.is_empty() => {
                return Err(RateError::MalformedFeed(format!(
                    "Document ended with {} unclosed element(s)",
                    path.len()
                )));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entries)
}

/// Daily reference rates published by the European Central Bank.
pub struct EcbFeed {
    url: String,
}

impl EcbFeed {
    pub fn new(url: &str) -> Self {
        EcbFeed {
            url: url.to_string(),
        }
    }
}

impl Default for EcbFeed {
    fn default() -> Self {
        Self::new(ECB_DAILY_URL)
    }
}

#[async_trait]
impl RateFeed for EcbFeed {
    #[instrument(name = "EcbRatesFetch", skip(self), fields(url = %self.url))]
    async fn fetch_rates(&self) -> Result<Vec<(String, f64)>, RateError> {
        debug!("Requesting exchange rates from {}", self.url);

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RateError::NetworkFailure(e.to_string()))?;

        let response = client.get(&self.url).send().await.map_err(|e| {
            RateError::NetworkFailure(format!("Request error: {} for URL: {}", e, self.url))
        })?;

        if !response.status().is_success() {
            return Err(RateError::NetworkFailure(format!(
                "HTTP error: {} for URL: {}",
                response.status(),
                self.url
            )));
        }

        let body = response.text().await.map_err(|e| {
            RateError::NetworkFailure(format!("Failed to read response body: {e}"))
        })?;

        let entries = parse_feed(&body)?;
        debug!("Parsed {} exchange rates", entries.len());
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DAILY_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gesmes:Envelope xmlns:gesmes="http://www.gesmes.org/xml/2002-08-01" xmlns="http://www.ecb.int/vocabulary/2002-08-01/eurofxref">
	<gesmes:subject>Reference rates</gesmes:subject>
	<gesmes:Sender>
		<gesmes:name>European Central Bank</gesmes:name>
	</gesmes:Sender>
	<Cube>
		<Cube time='2024-03-01'>
			<Cube currency='USD' rate='1.0838'/>
			<Cube currency='JPY' rate='162.53'/>
			<Cube currency='GBP' rate='0.85663'/>
		</Cube>
	</Cube>
</gesmes:Envelope>"#;

    async fn create_mock_server(status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/stats/eurofxref/eurofxref-daily.xml"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn feed_url(server: &MockServer) -> String {
        format!("{}/stats/eurofxref/eurofxref-daily.xml", server.uri())
    }

    #[test]
    fn test_parse_daily_feed() {
        let entries = parse_feed(DAILY_XML).unwrap();
        assert_eq!(
            entries,
            vec![
                ("USD".to_string(), 1.0838),
                ("JPY".to_string(), 162.53),
                ("GBP".to_string(), 0.85663),
            ]
        );
    }

    #[test]
    fn test_parse_discovers_changed_namespace() {
        let xml = r#"<Envelope xmlns="urn:example:rates:v2">
            <Cube><Cube><Cube currency="CHF" rate="0.95"></Cube></Cube></Cube>
        </Envelope>"#;
        let entries = parse_feed(xml).unwrap();
        assert_eq!(entries, vec![("CHF".to_string(), 0.95)]);
    }

    #[test]
    fn test_parse_ignores_elements_off_the_path() {
        let xml = r#"<e:Envelope xmlns:e="urn:envelope" xmlns="urn:rates">
            <Cube>
                <Cube>
                    <o:Cube xmlns:o="urn:other" currency="XXX" rate="9.9"/>
                    <Cube currency="USD" rate="1.1"/>
                    <Cube currency="SEK" rate="11.2"><Cube currency="NOK" rate="11.5"/></Cube>
                </Cube>
                <Cube currency="DKK" rate="7.46"/>
            </Cube>
            <e:Cube><Cube><Cube currency="PLN" rate="4.3"/></Cube></e:Cube>
        </e:Envelope>"#;
        let entries = parse_feed(xml).unwrap();
        assert_eq!(
            entries,
            vec![("USD".to_string(), 1.1), ("SEK".to_string(), 11.2)]
        );
    }

    #[test]
    fn test_parse_without_leaves_is_empty() {
        let xml = r#"<Envelope xmlns="urn:rates"><Cube><Cube time="2024-03-01"/></Cube></Envelope>"#;
        assert!(parse_feed(xml).unwrap().is_empty());
    }

    #[test]
    fn test_parse_missing_namespace() {
        let xml = r#"<Envelope><Cube><Cube><Cube currency="USD" rate="1.1"/></Cube></Cube></Envelope>"#;
        assert_eq!(
            parse_feed(xml),
            Err(RateError::MalformedFeed(
                "No default namespace declared".to_string()
            ))
        );
    }

    #[test]
    fn test_parse_missing_attribute() {
        let xml = r#"<Envelope xmlns="urn:rates"><Cube><Cube><Cube currency="USD"/></Cube></Cube></Envelope>"#;
        assert_eq!(
            parse_feed(xml),
            Err(RateError::MalformedFeed(
                "Missing 'rate' attribute".to_string()
            ))
        );
    }

    #[test]
    fn test_parse_missing_currency() {
        let xml = r#"<Envelope xmlns="urn:rates"><Cube><Cube><Cube rate="1.1"/></Cube></Cube></Envelope>"#;
        assert_eq!(
            parse_feed(xml),
            Err(RateError::MalformedFeed(
                "Missing 'currency' attribute".to_string()
            ))
        );
    }

    #[test]
    fn test_parse_truncated_document() {
        let xml = r#"<gesmes:Envelope xmlns:gesmes="http://www.gesmes.org/xml/2002-08-01" xmlns="urn:rates">
            <Cube><Cube time="2024-03-01"><Cube currency="USD" rate="1.1"/>"#;
        assert_eq!(
            parse_feed(xml),
            Err(RateError::MalformedFeed(
                "Document ended with 3 unclosed element(s)".to_string()
            ))
        );
    }

    #[test]
    fn test_parse_rejects_second_root() {
        let xml = r#"<Envelope xmlns="urn:a"><Cube><Cube><Cube currency="USD" rate="1.1"/></Cube></Cube></Envelope><Envelope xmlns="urn:a"><Cube><Cube><Cube currency="JPY" rate="160"/></Cube></Cube></Envelope>"#;
        assert_eq!(
            parse_feed(xml),
            Err(RateError::MalformedFeed(
                "Content after the root element".to_string()
            ))
        );

        let xml = r#"<Envelope xmlns="urn:a"/><Extra/>"#;
        assert!(matches!(parse_feed(xml), Err(RateError::MalformedFeed(_))));
    }

    #[test]
    fn test_parse_invalid_rate() {
        for rate in ["abc", "0", "-1.5"] {
            let xml = format!(
                r#"<Envelope xmlns="urn:rates"><Cube><Cube><Cube currency="USD" rate="{rate}"/></Cube></Cube></Envelope>"#
            );
            assert_eq!(
                parse_feed(&xml),
                Err(RateError::MalformedFeed(format!(
                    "Invalid rate '{rate}' for USD"
                )))
            );
        }
    }

    #[test]
    fn test_parse_mismatched_tags() {
        let xml = r#"<Envelope xmlns="urn:rates"><Cube></Envelope>"#;
        assert!(matches!(parse_feed(xml), Err(RateError::MalformedFeed(_))));
    }

    #[tokio::test]
    async fn test_successful_rates_fetch() {
        let mock_server = create_mock_server(200, DAILY_XML).await;
        let feed = EcbFeed::new(&feed_url(&mock_server));

        let entries = feed.fetch_rates().await.expect("Failed to fetch rates");
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], ("USD".to_string(), 1.0838));
    }

    #[tokio::test]
    async fn test_ecb_api_error_response() {
        let mock_server = create_mock_server(500, "").await;
        let url = feed_url(&mock_server);
        let feed = EcbFeed::new(&url);

        let result = feed.fetch_rates().await;
        assert_eq!(
            result,
            Err(RateError::NetworkFailure(format!(
                "HTTP error: 500 Internal Server Error for URL: {url}"
            )))
        );
    }

    #[tokio::test]
    async fn test_ecb_api_malformed_response() {
        let mock_server = create_mock_server(200, "<html><body>maintenance</body></html>").await;
        let feed = EcbFeed::new(&feed_url(&mock_server));

        let result = feed.fetch_rates().await;
        assert!(matches!(result, Err(RateError::MalformedFeed(_))));
    }

    #[tokio::test]
    async fn test_ecb_unreachable() {
        let feed = EcbFeed::new("http://127.0.0.1:1/eurofxref-daily.xml");
        assert!(matches!(
            feed.fetch_rates().await,
            Err(RateError::NetworkFailure(_))
        ));
    }
}
