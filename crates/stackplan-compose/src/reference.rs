//! Service reference grammar.
//!
//! An environment value may point at another service in two ways:
//!
//! - explicitly, with `${<service>.host}`, `${<service>.port}` or
//!   `${<service>.address}` placeholders anywhere in the value (`$$` is a
//!   literal `$`; any other `${...}` is left for the container runtime);
//! - implicitly, when the whole value is a declared service name, or a
//!   declared name followed by `:<port>`.
//!
//! `depends_on` and `links` entries are ordering-only references.

use std::fmt;

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_till1, take_while1},
    character::complete::char,
    combinator::{map, map_opt, value},
    multi::many0,
    sequence::delimited,
};
use serde::Serialize;
use stackplan_common::types::is_valid_service_name;

use crate::model::ServiceSpec;

/// The property of a service a reference asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Attribute {
    /// Host name of the service on the project network.
    Host,
    /// Primary container port of the service.
    Port,
    /// `host:port`.
    Address,
}

impl Attribute {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "host" => Some(Self::Host),
            "port" => Some(Self::Port),
            "address" => Some(Self::Address),
            _ => None,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => write!(f, "host"),
            Self::Port => write!(f, "port"),
            Self::Address => write!(f, "address"),
        }
    }
}

/// A reference from an environment value to another service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Reference {
    /// Referenced service name.
    pub service: String,
    /// Requested attribute.
    pub attribute: Attribute,
    /// `true` for `${...}` placeholders, `false` for bare names.
    pub explicit: bool,
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.explicit {
            write!(f, "${{{}.{}}}", self.service, self.attribute)
        } else {
            write!(f, "{}", self.service)
        }
    }
}

/// A piece of an environment value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text copied verbatim.
    Literal(String),
    /// A reference to substitute.
    Ref(Reference),
}

fn placeholder(input: &str) -> IResult<&str, Reference> {
    map_opt(
        delimited(
            tag("${"),
            take_while1(|c: char| c != '}' && c != '$'),
            char('}'),
        ),
        |body: &str| {
            let (service, keyword) = body.rsplit_once('.')?;
            if !is_valid_service_name(service) {
                return None;
            }
            Some(Reference {
                service: service.to_string(),
                attribute: Attribute::from_keyword(keyword)?,
                explicit: true,
            })
        },
    )
    .parse(input)
}

fn segment(input: &str) -> IResult<&str, Segment> {
    alt((
        value(Segment::Literal("$".to_string()), tag("$$")),
        map(placeholder, Segment::Ref),
        map(take_till1(|c: char| c == '$'), |s: &str| {
            Segment::Literal(s.to_string())
        }),
        map(tag("$"), |s: &str| Segment::Literal(s.to_string())),
    ))
    .parse(input)
}

/// Splits a value into literal text and explicit `${...}` references.
#[must_use]
pub fn parse_value(input: &str) -> Vec<Segment> {
    let segments = match many0(segment).parse(input) {
        Ok((_, segments)) => segments,
        Err(_) => vec![Segment::Literal(input.to_string())],
    };
    merge_literals(segments)
}

fn merge_literals(segments: Vec<Segment>) -> Vec<Segment> {
    let mut merged: Vec<Segment> = Vec::with_capacity(segments.len());
    for seg in segments {
        if let Segment::Literal(next) = &seg {
            if let Some(Segment::Literal(prev)) = merged.last_mut() {
                prev.push_str(next);
                continue;
            }
        }
        merged.push(seg);
    }
    merged
}

/// Splits a value of service `owner` into segments, recognising bare
/// service names as well.
///
/// `is_declared` decides which bare words count as service names; bare
/// references therefore only ever point at existing services. A bare word
/// equal to `owner` stays literal.
pub fn scan_value(
    input: &str,
    owner: &str,
    is_declared: impl Fn(&str) -> bool,
    bare: bool,
) -> Vec<Segment> {
    let is_peer = |name: &str| name != owner && is_declared(name);
    if bare && !input.contains('$') {
        if is_peer(input) {
            return vec![Segment::Ref(implicit_host(input))];
        }
        if let Some((name, port)) = input.split_once(':') {
            if is_peer(name) && !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) {
                return vec![
                    Segment::Ref(implicit_host(name)),
                    Segment::Literal(format!(":{port}")),
                ];
            }
        }
    }
    parse_value(input)
}

fn implicit_host(name: &str) -> Reference {
    Reference {
        service: name.to_string(),
        attribute: Attribute::Host,
        explicit: false,
    }
}

/// Renders segments back to text, keeping references in placeholder form.
#[must_use]
pub fn render_template(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|seg| match seg {
            Segment::Literal(text) => text.clone(),
            Segment::Ref(reference) => reference.to_string(),
        })
        .collect()
}

/// How a service came to depend on another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Via {
    /// A reference inside an environment value.
    Environment {
        /// Environment variable holding the reference.
        key: String,
        /// The reference itself.
        reference: Reference,
    },
    /// A `depends_on` entry.
    DependsOn,
    /// A `links` entry.
    Link,
}

impl fmt::Display for Via {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Environment { key, reference } => write!(f, "environment {key}={reference}"),
            Self::DependsOn => write!(f, "depends_on"),
            Self::Link => write!(f, "links"),
        }
    }
}

/// An edge from a service to a service it needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    /// Name of the service depended upon.
    pub target: String,
    /// Where the dependency was declared.
    pub via: Via,
}

/// Collects every service `spec` depends on, in declaration order.
///
/// Targets are not checked against the store here; explicit placeholders,
/// `depends_on` and `links` may name services that do not exist.
pub fn dependencies(
    spec: &ServiceSpec,
    is_declared: impl Fn(&str) -> bool,
    bare: bool,
) -> Vec<Dependency> {
    let mut deps = Vec::new();
    for target in &spec.depends_on {
        deps.push(Dependency {
            target: target.clone(),
            via: Via::DependsOn,
        });
    }
    for target in spec.link_targets() {
        deps.push(Dependency {
            target: target.to_string(),
            via: Via::Link,
        });
    }
    for (key, raw) in &spec.environment {
        for seg in scan_value(raw, &spec.name, &is_declared, bare) {
            if let Segment::Ref(reference) = seg {
                deps.push(Dependency {
                    target: reference.service.clone(),
                    via: Via::Environment {
                        key: key.clone(),
                        reference,
                    },
                });
            }
        }
    }
    deps
}
