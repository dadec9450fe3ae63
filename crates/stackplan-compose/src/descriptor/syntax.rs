//! Short-syntax decoding for `ports` and `volumes` entries using `nom`.
//!
//! Both syntaxes are colon-separated field lists. The parsers split the
//! fields; interpretation by field count happens in plain Rust afterwards.

use nom::{
    IResult, Parser,
    bytes::complete::take_while,
    character::complete::{alpha1, char},
    combinator::{all_consuming, opt},
    multi::separated_list1,
    sequence::preceded,
};
use stackplan_common::error::{StackplanError, Result};
use stackplan_common::types::{PortBinding, Protocol, VolumeMount};

const VOLUME_MODES: &[&str] = &["ro", "rw", "z", "Z", "cached", "delegated", "consistent", "nocopy"];

/// Splits `[ip:][host:]container[/proto]` into its fields and protocol.
fn port_fields(input: &str) -> IResult<&str, (Vec<&str>, Option<&str>)> {
    all_consuming((
        separated_list1(char(':'), take_while(|c: char| c != ':' && c != '/')),
        opt(preceded(char('/'), alpha1)),
    ))
    .parse(input)
}

/// Splits `source:target[:mode]` into its fields.
fn volume_fields(input: &str) -> IResult<&str, Vec<&str>> {
    all_consuming(separated_list1(char(':'), take_while(|c: char| c != ':'))).parse(input)
}

fn syntax_err(kind: &str, input: &str, detail: &str) -> StackplanError {
    StackplanError::Config {
        message: format!("invalid {kind} \"{input}\": {detail}"),
    }
}

fn port_number(field: &str, input: &str) -> Result<u16> {
    if field.contains('-') {
        return Err(syntax_err("port", input, "port ranges are not supported"));
    }
    match field.parse::<u16>() {
        Ok(0) | Err(_) => Err(syntax_err(
            "port",
            input,
            &format!("\"{field}\" is not a port number"),
        )),
        Ok(port) => Ok(port),
    }
}

/// Parses a `ports` short-syntax entry.
///
/// # Errors
///
/// Returns an error for malformed entries, port ranges, or unknown protocols.
pub fn parse_port(input: &str) -> Result<PortBinding> {
    let (_, (fields, proto)) =
        port_fields(input).map_err(|_| syntax_err("port", input, "malformed entry"))?;

    let protocol = match proto {
        None | Some("tcp") => Protocol::Tcp,
        Some("udp") => Protocol::Udp,
        Some(other) => {
            return Err(syntax_err(
                "port",
                input,
                &format!("unknown protocol \"{other}\""),
            ));
        }
    };

    let (host_ip, host_port, container) = match fields.as_slice() {
        [container] => (None, None, *container),
        [host, container] => (None, Some(*host), *container),
        [ip, host, container] => (Some(*ip), Some(*host), *container),
        _ => return Err(syntax_err("port", input, "too many fields")),
    };

    let host_port = match host_port {
        Some(field) if !field.is_empty() => Some(port_number(field, input)?),
        _ => None,
    };

    Ok(PortBinding {
        host_ip: host_ip.filter(|ip| !ip.is_empty()).map(str::to_string),
        host_port,
        container_port: port_number(container, input)?,
        protocol,
    })
}

/// Parses a `volumes` short-syntax entry.
///
/// # Errors
///
/// Returns an error if the target is missing or not absolute, or the mode is unknown.
pub fn parse_volume(input: &str) -> Result<VolumeMount> {
    let (_, fields) =
        volume_fields(input).map_err(|_| syntax_err("volume", input, "malformed entry"))?;

    let (source, target, mode) = match fields.as_slice() {
        [target] => (None, *target, None),
        [source, target] => (Some(*source), *target, None),
        [source, target, mode] => (Some(*source), *target, Some(*mode)),
        _ => return Err(syntax_err("volume", input, "too many fields")),
    };

    if !target.starts_with('/') {
        return Err(syntax_err(
            "volume",
            input,
            "container path must be absolute",
        ));
    }

    let mut read_only = false;
    if let Some(mode) = mode {
        for flag in mode.split(',') {
            if !VOLUME_MODES.contains(&flag) {
                return Err(syntax_err(
                    "volume",
                    input,
                    &format!("unknown mode \"{flag}\""),
                ));
            }
            read_only |= flag == "ro";
        }
    }

    Ok(VolumeMount {
        source: source.filter(|s| !s.is_empty()).map(str::to_string),
        target: target.to_string(),
        read_only,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_container_only() {
        let port = parse_port("28015").expect("should parse");
        assert_eq!(port, PortBinding::container(28015));
    }

    #[test]
    fn port_host_and_container() {
        let port = parse_port("58585:8080").expect("should parse");
        assert_eq!(port, PortBinding::published(58585, 8080));
    }

    #[test]
    fn port_with_ip_and_protocol() {
        let port = parse_port("127.0.0.1:5353:53/udp").expect("should parse");
        assert_eq!(port.host_ip.as_deref(), Some("127.0.0.1"));
        assert_eq!(port.host_port, Some(5353));
        assert_eq!(port.container_port, 53);
        assert_eq!(port.protocol, Protocol::Udp);
    }

    #[test]
    fn port_with_ip_and_random_host_port() {
        let port = parse_port("127.0.0.1::9984").expect("should parse");
        assert_eq!(port.host_ip.as_deref(), Some("127.0.0.1"));
        assert_eq!(port.host_port, None);
        assert_eq!(port.container_port, 9984);
    }

    #[test]
    fn port_range_rejected() {
        let err = parse_port("8000-8010:8000-8010").unwrap_err();
        assert!(err.to_string().contains("ranges"), "got: {err}");
    }

    #[test]
    fn port_garbage_rejected() {
        assert!(parse_port("http").is_err());
        assert!(parse_port("80/sctp").is_err());
        assert!(parse_port("0").is_err());
        assert!(parse_port("70000").is_err());
    }

    #[test]
    fn volume_bind_mount() {
        let vol = parse_volume("./docs:/usr/src/app/docs").expect("should parse");
        assert_eq!(vol.source.as_deref(), Some("./docs"));
        assert_eq!(vol.target, "/usr/src/app/docs");
        assert!(!vol.read_only);
    }

    #[test]
    fn volume_read_only_mode() {
        let vol = parse_volume("/etc/hosts:/etc/hosts:ro,z").expect("should parse");
        assert!(vol.read_only);
    }

    #[test]
    fn volume_anonymous() {
        let vol = parse_volume("/data").expect("should parse");
        assert!(vol.source.is_none());
        assert_eq!(vol.target, "/data");
    }

    #[test]
    fn volume_relative_target_rejected() {
        let err = parse_volume("./docs:docs").unwrap_err();
        assert!(err.to_string().contains("absolute"), "got: {err}");
    }

    #[test]
    fn volume_unknown_mode_rejected() {
        assert!(parse_volume("./a:/a:rx").is_err());
    }
}
