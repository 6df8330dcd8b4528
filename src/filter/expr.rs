use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::str::FromStr;

use lazy_static::lazy_static;
use thiserror::Error;

use super::{Filter, FilterElement};
use crate::headers::{PROTO_ICMP, PROTO_TCP, PROTO_UDP};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterParseError {
    #[error("empty term in filter expression")]
    EmptyTerm,
    #[error("expected key=value, got {0:?}")]
    MissingValue(String),
    #[error("unknown filter key {0:?}")]
    UnknownKey(String),
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Src,
    Dst,
    SrcPort,
    DstPort,
    Proto,
    Tos,
    Dscp,
    Every,
}

lazy_static! {
    static ref FIELDS: HashMap<&'static str, Field> = {
        let mut m = HashMap::new();
        for k in ["src", "saddr", "src-ip"] {
            m.insert(k, Field::Src);
        }
        for k in ["dst", "daddr", "dst-ip"] {
            m.insert(k, Field::Dst);
        }
        for k in ["sport", "src-port"] {
            m.insert(k, Field::SrcPort);
        }
        for k in ["dport", "dst-port"] {
            m.insert(k, Field::DstPort);
        }
        for k in ["proto", "protocol"] {
            m.insert(k, Field::Proto);
        }
        m.insert("tos", Field::Tos);
        m.insert("dscp", Field::Dscp);
        m.insert("every", Field::Every);
        m
    };
    static ref PROTOCOLS: HashMap<&'static str, u8> = {
        let mut m = HashMap::new();
        m.insert("icmp", PROTO_ICMP);
        m.insert("tcp", PROTO_TCP);
        m.insert("udp", PROTO_UDP);
        m
    };
}

fn parse_u8(s: &str) -> Option<u8> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

fn parse_term(term: &str) -> Result<FilterElement, FilterParseError> {
    let (key, value) = term
        .split_once('=')
        .ok_or_else(|| FilterParseError::MissingValue(term.to_string()))?;
    let key = key.trim().to_ascii_lowercase();
    let value = value.trim();

    let field = *FIELDS
        .get(key.as_str())
        .ok_or_else(|| FilterParseError::UnknownKey(key.clone()))?;

    let invalid = || FilterParseError::InvalidValue {
        key: key.clone(),
        value: value.to_string(),
    };

    let element = match field {
        Field::Src => FilterElement::SourceAddress(value.parse::<Ipv4Addr>().map_err(|_| invalid())?),
        Field::Dst => FilterElement::DestAddress(value.parse::<Ipv4Addr>().map_err(|_| invalid())?),
        Field::SrcPort => FilterElement::SourcePort(value.parse().map_err(|_| invalid())?),
        Field::DstPort => FilterElement::DestPort(value.parse().map_err(|_| invalid())?),
        Field::Proto => {
            let proto = PROTOCOLS
                .get(value.to_ascii_lowercase().as_str())
                .copied()
                .or_else(|| parse_u8(value))
                .ok_or_else(invalid)?;
            FilterElement::Protocol(proto)
        }
        Field::Tos => FilterElement::Tos(parse_u8(value).ok_or_else(invalid)?),
        Field::Dscp => {
            // DSCP sits in the upper six bits of the ToS byte
            let dscp = parse_u8(value).filter(|d| *d <= 63).ok_or_else(invalid)?;
            FilterElement::Tos(dscp << 2)
        }
        Field::Every => {
            let every: u64 = value.parse().map_err(|_| invalid())?;
            if every == 0 {
                return Err(invalid());
            }
            FilterElement::packet_ordinal(every)
        }
    };
    Ok(element)
}

/// Parses `key=value[,key=value...]`. `""` and `"any"` are the match-all
/// filter.
impl FromStr for Filter {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("any") {
            return Ok(Filter::new());
        }

        let mut filter = Filter::new();
        for term in s.split(',') {
            let term = term.trim();
            if term.is_empty() {
                return Err(FilterParseError::EmptyTerm);
            }
            filter.add_element(parse_term(term)?);
        }
        Ok(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases_and_protocol_names() {
        let f: Filter = "saddr=10.0.0.1, dst-port=9, proto=UDP".parse().unwrap();
        assert_eq!(f.to_string(), "src=10.0.0.1,dport=9,proto=17");
    }

    #[test]
    fn parses_tos_and_dscp() {
        let f: Filter = "tos=0xb8".parse().unwrap();
        assert!(matches!(f.elements(), [FilterElement::Tos(0xb8)]));

        let f: Filter = "dscp=46".parse().unwrap();
        assert!(matches!(f.elements(), [FilterElement::Tos(0xb8)]));
    }

    #[test]
    fn parses_ordinal() {
        let f: Filter = "every=4".parse().unwrap();
        assert!(matches!(
            f.elements(),
            [FilterElement::PacketOrdinal { every: 4, .. }]
        ));
    }

    #[test]
    fn any_is_empty_filter() {
        assert!("any".parse::<Filter>().unwrap().elements().is_empty());
        assert!("".parse::<Filter>().unwrap().elements().is_empty());
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            "colour=red".parse::<Filter>().unwrap_err(),
            FilterParseError::UnknownKey("colour".into())
        );
        assert_eq!(
            "dport".parse::<Filter>().unwrap_err(),
            FilterParseError::MissingValue("dport".into())
        );
        assert_eq!(
            "dport=9,,proto=tcp".parse::<Filter>().unwrap_err(),
            FilterParseError::EmptyTerm
        );
        assert!(matches!(
            "dport=70000".parse::<Filter>(),
            Err(FilterParseError::InvalidValue { .. })
        ));
        assert!(matches!(
            "dscp=64".parse::<Filter>(),
            Err(FilterParseError::InvalidValue { .. })
        ));
        assert!(matches!(
            "every=0".parse::<Filter>(),
            Err(FilterParseError::InvalidValue { .. })
        ));
    }
}
