use std::collections::HashMap;

use serde::Serialize;

use super::{child, parse_envelope, text_of};
use crate::error::FetchError;

/// One `domainInfoItem` from a `domainListExtended` response.
///
/// Every field is free text straight from the API; a key the API left out is
/// an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DomainRecord {
    pub domain_name: String,
    pub reg_type: String,
    pub reseller: String,
    pub admin_c: String,
    pub owner_c: String,
    pub tech_c: String,
    pub zone_c: String,
    pub nameserver: String,
    pub status: String,
    pub domain_status: String,
    pub reg_status: String,
    pub system_in_date: String,
    pub order_date: String,
    pub order_number: String,
    pub to_be_deleted_date: String,
    pub trustee_wpp: String,
    pub irtp_status: String,
}

impl DomainRecord {
    /// Label names of the `domain_info` metric, in [`label_values`](Self::label_values) order.
    pub const LABELS: [&'static str; 17] = [
        "domain",
        "reg_type",
        "reseller",
        "adminC",
        "ownerC",
        "techC",
        "zoneC",
        "nameserver",
        "status",
        "domainStatus",
        "regStatus",
        "systemInDate",
        "orderDate",
        "orderNumber",
        "toBeDeletedDate",
        "trusteeWPP",
        "irtpStatus",
    ];

    /// Builds a record from the key/value pairs of one item.
    ///
    /// Returns `None` when `domainName` is missing or empty.
    pub fn from_fields(mut fields: HashMap<String, String>) -> Option<Self> {
        let domain_name = fields.remove("domainName").filter(|d| !d.is_empty())?;
        let mut take = |key: &str| fields.remove(key).unwrap_or_default();

        Some(DomainRecord {
            domain_name,
            reg_type: take("regType"),
            reseller: take("reseller"),
            admin_c: take("adminC"),
            owner_c: take("ownerC"),
            tech_c: take("techC"),
            zone_c: take("zoneC"),
            nameserver: take("nameserver"),
            status: take("status"),
            domain_status: take("domainStatus"),
            reg_status: take("regStatus"),
            system_in_date: take("systemInDate"),
            order_date: take("orderDate"),
            order_number: take("orderNumber"),
            to_be_deleted_date: take("toBeDeletedDate"),
            trustee_wpp: take("trusteeWPP"),
            irtp_status: take("irtpStatus"),
        })
    }

    pub fn label_values(&self) -> [&str; 17] {
        [
            self.domain_name.as_str(),
            self.reg_type.as_str(),
            self.reseller.as_str(),
            self.admin_c.as_str(),
            self.owner_c.as_str(),
            self.tech_c.as_str(),
            self.zone_c.as_str(),
            self.nameserver.as_str(),
            self.status.as_str(),
            self.domain_status.as_str(),
            self.reg_status.as_str(),
            self.system_in_date.as_str(),
            self.order_date.as_str(),
            self.order_number.as_str(),
            self.to_be_deleted_date.as_str(),
            self.trustee_wpp.as_str(),
            self.irtp_status.as_str(),
        ]
    }
}

/// Extracts all domain records from a `domainListExtended` response.
///
/// Items without a `domainName`, and key/value pairs missing either half, are
/// skipped silently. Only a body that is not well-formed XML (or is a SOAP
/// fault) fails.
pub fn parse_domain_list(text: &str) -> Result<Vec<DomainRecord>, FetchError> {
    let doc = parse_envelope(text)?;

    let records = doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "domainInfoItem")
        .filter_map(|info| {
            let fields: HashMap<String, String> = info
                .children()
                .filter(|n| n.is_element() && n.tag_name().name() == "item")
                .filter_map(|item| {
                    let key = text_of(child(item, "key")?);
                    let value = text_of(child(item, "value")?);
                    (!key.is_empty()).then_some((key, value))
                })
                .collect();
            DomainRecord::from_fields(fields)
        })
        .collect();

    Ok(records)
}
