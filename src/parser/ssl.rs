use std::collections::HashMap;

use serde::Serialize;

use super::{parse_envelope, text_of, xsi_type};
use crate::error::FetchError;

const SECONDS_PER_DAY: i64 = 86_400;

/// One certificate item (`xsi:type` ending in `SslInfo`) from an SSL listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SslRecord {
    pub domain: String,
    pub order_number: String,
    pub reseller: String,
    pub status: String,
    pub software: String,
    pub product_id: String,
    /// Unix epoch seconds, as sent by the API
    pub not_valid_before: String,
    /// Unix epoch seconds, as sent by the API
    pub not_valid_after: String,
}

impl SslRecord {
    pub const INFO_LABELS: [&'static str; 8] = [
        "domain",
        "orderNumber",
        "reseller",
        "status",
        "software",
        "productId",
        "valid_from",
        "valid_to",
    ];

    pub fn from_fields(mut fields: HashMap<String, String>) -> Self {
        let mut take = |key: &str| fields.remove(key).unwrap_or_default();

        SslRecord {
            domain: take("domain"),
            order_number: take("orderNumber"),
            reseller: take("reseller"),
            status: take("status"),
            software: take("software"),
            product_id: take("productId"),
            not_valid_before: take("notValidBefore"),
            not_valid_after: take("notValidAfter"),
        }
    }

    pub fn info_label_values(&self) -> [&str; 8] {
        [
            self.domain.as_str(),
            self.order_number.as_str(),
            self.reseller.as_str(),
            self.status.as_str(),
            self.software.as_str(),
            self.product_id.as_str(),
            self.not_valid_before.as_str(),
            self.not_valid_after.as_str(),
        ]
    }

    /// Validity bounds as epoch seconds.
    ///
    /// If either bound is missing or not an integer, both are reported as 0
    /// and treated as absent.
    pub fn validity(&self) -> (i64, i64) {
        match (
            self.not_valid_before.trim().parse::<i64>(),
            self.not_valid_after.trim().parse::<i64>(),
        ) {
            (Ok(from), Ok(to)) => (from, to),
            _ => (0, 0),
        }
    }

    pub fn valid_from(&self) -> Option<i64> {
        Some(self.validity().0).filter(|v| *v != 0)
    }

    pub fn valid_to(&self) -> Option<i64> {
        Some(self.validity().1).filter(|v| *v != 0)
    }

    /// Whole days until expiry relative to `now`, rounded towards negative
    /// infinity. Negative once the certificate has expired.
    ///
    /// `None` without both bounds, or when the bound is too far from `now`
    /// to be represented.
    pub fn days_remaining(&self, now: i64) -> Option<i64> {
        match self.validity() {
            (from, to) if from != 0 && to != 0 => {
                Some(to.checked_sub(now)?.div_euclid(SECONDS_PER_DAY))
            }
            _ => None,
        }
    }
}

/// Extracts all certificate records from an SSL listing response.
///
/// Children of each certificate item are flattened by local name; anything
/// the record does not know about is ignored.
pub fn parse_ssl_list(text: &str) -> Result<Vec<SslRecord>, FetchError> {
    let doc = parse_envelope(text)?;

    let records = doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "item")
        .filter(|n| xsi_type(*n).is_some_and(|t| t.ends_with("SslInfo")))
        .map(|item| {
            let fields: HashMap<String, String> = item
                .children()
                .filter(|n| n.is_element())
                .map(|n| (n.tag_name().name().to_string(), text_of(n)))
                .collect();
            SslRecord::from_fields(fields)
        })
        .collect();

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn envelope(items: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/"
    xmlns:ns1="http://soap.domain-bestellsystem.de/soap/1.1/"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <SOAP-ENV:Body>
    <ns1:sslListResponse>
      <return xsi:type="ns1:ArrayOfSslInfo">{}</return>
    </ns1:sslListResponse>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#,
            items
        )
    }

    fn cert(domain: &str, before: &str, after: &str) -> String {
        format!(
            r#"<item xsi:type="ns1:SslInfo">
                 <ns1:domain>{}</ns1:domain>
                 <orderNumber>A-1</orderNumber>
                 <reseller>acme</reseller>
                 <status>active</status>
                 <software>nginx</software>
                 <productId>42</productId>
                 <notValidBefore>{}</notValidBefore>
                 <notValidAfter>{}</notValidAfter>
               </item>"#,
            domain, before, after
        )
    }

    fn record(before: &str, after: &str) -> SslRecord {
        SslRecord {
            domain: "example.de".to_string(),
            not_valid_before: before.to_string(),
            not_valid_after: after.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_records() {
        let xml = envelope(&format!(
            "{}{}",
            cert("example.de", "1690000000", "1710000000"),
            cert("example.com", "", "")
        ));
        let records = parse_ssl_list(&xml).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].domain, "example.de");
        assert_eq!(records[0].product_id, "42");
        assert_eq!(records[0].validity(), (1_690_000_000, 1_710_000_000));
        assert_eq!(records[1].domain, "example.com");
        assert_eq!(records[1].validity(), (0, 0));
    }

    #[test]
    fn test_items_without_ssl_type_are_ignored() {
        let xml = envelope(
            r#"<item xsi:type="ns1:FilterItem"><domain>x.de</domain></item>
               <item><domain>y.de</domain></item>
               <entry xsi:type="ns1:SslInfo"><domain>z.de</domain></entry>"#,
        );
        assert!(parse_ssl_list(&xml).unwrap().is_empty());
    }

    #[test]
    fn test_missing_children_are_empty() {
        let xml = envelope(r#"<item xsi:type="ns1:DomainSslInfo"><domain>x.de</domain></item>"#);
        let records = parse_ssl_list(&xml).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].software, "");
        assert_eq!(records[0].days_remaining(NOW), None);
    }

    #[test]
    fn test_days_remaining() {
        let ten_days = record("1690000000", &(NOW + 864_000).to_string());
        assert_eq!(ten_days.days_remaining(NOW), Some(10));

        let almost_eleven = record("1690000000", &(NOW + 950_399).to_string());
        assert_eq!(almost_eleven.days_remaining(NOW), Some(10));
    }

    #[test]
    fn test_days_remaining_expired_is_negative() {
        let expired = record("1690000000", &(NOW - 3_600).to_string());
        assert_eq!(expired.days_remaining(NOW), Some(-1));

        let long_expired = record("1690000000", &(NOW - 864_000).to_string());
        assert_eq!(long_expired.days_remaining(NOW), Some(-10));
    }

    #[test]
    fn test_days_remaining_extreme_bounds() {
        let ancient = record("1690000000", &i64::MIN.to_string());
        assert_eq!(ancient.valid_to(), Some(i64::MIN));
        assert_eq!(ancient.days_remaining(NOW), None);

        let distant = record("1690000000", &i64::MAX.to_string());
        assert_eq!(distant.days_remaining(-NOW), None);
        assert_eq!(
            distant.days_remaining(NOW),
            Some((i64::MAX - NOW).div_euclid(SECONDS_PER_DAY))
        );
    }

    #[test]
    fn test_one_bad_bound_suppresses_both() {
        let bad = record("not-a-number", "1710000000");
        assert_eq!(bad.validity(), (0, 0));
        assert_eq!(bad.valid_from(), None);
        assert_eq!(bad.valid_to(), None);
        assert_eq!(bad.days_remaining(NOW), None);
    }

    #[test]
    fn test_bounds_tolerate_whitespace() {
        let padded = record(" 1690000000\n", "\t1710000000 ");
        assert_eq!(padded.valid_from(), Some(1_690_000_000));
        assert_eq!(padded.valid_to(), Some(1_710_000_000));
    }

    #[test]
    fn test_malformed_xml() {
        assert!(matches!(
            parse_ssl_list("<item xsi:type=\"SslInfo\"><domain>x.de</dom"),
            Err(FetchError::Parse { .. })
        ));
    }
}
