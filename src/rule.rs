use std::str::FromStr;

/// Rule types the routing client understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Domain,
    DomainSuffix,
    DomainKeyword,
    IpCidr,
    IpCidr6,
    GeoIp,
    Match,
    ProcessName,
    RuleSet,
}

impl FromStr for RuleKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "DOMAIN" => Self::Domain,
            "DOMAIN-SUFFIX" => Self::DomainSuffix,
            "DOMAIN-KEYWORD" => Self::DomainKeyword,
            "IP-CIDR" => Self::IpCidr,
            "IP-CIDR6" => Self::IpCidr6,
            "GEOIP" => Self::GeoIp,
            "MATCH" => Self::Match,
            "PROCESS-NAME" => Self::ProcessName,
            "RULE-SET" => Self::RuleSet,
            _ => return Err(()),
        })
    }
}

/**
 * One `TYPE,payload,target[,options]` line.
 * `MATCH` has no payload: `MATCH,target`.
 */
#[derive(Debug, PartialEq, Eq)]
pub struct Rule<'a> {
    pub kind_name: &'a str,
    pub kind: Option<RuleKind>,
    parts: Vec<&'a str>,
}

impl<'a> Rule<'a> {
    /// `None` when the line has fewer than two comma separated parts.
    pub fn parse(line: &'a str) -> Option<Self> {
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if parts.len() < 2 {
            return None;
        }
        Some(Self {
            kind_name: parts[0],
            kind: RuleKind::from_str(parts[0]).ok(),
            parts,
        })
    }

    /// The proxy, group or virtual target traffic is routed to.
    /// Unknown kinds have no fixed layout, so none is resolved for them.
    pub fn target(&self) -> Option<&'a str> {
        let index = match self.kind? {
            RuleKind::Match => 1,
            _ => 2,
        };
        self.parts.get(index).copied().filter(|t| !t.is_empty())
    }
}
