use serde::Serialize;

/// The fixed set of Nessus fields that survive into the CSV. Variant order is
/// the column order of the output header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanField {
    RiskFactor,
    CvssBaseScore,
    HostIp,
    HostFqdn,
    Port,
    OperatingSystem,
    PluginName,
    Cve,
}

impl ScanField {
    pub const ALL: [ScanField; 8] = [
        ScanField::RiskFactor,
        ScanField::CvssBaseScore,
        ScanField::HostIp,
        ScanField::HostFqdn,
        ScanField::Port,
        ScanField::OperatingSystem,
        ScanField::PluginName,
        ScanField::Cve,
    ];

    /// Identifier used by Nessus itself, either as a `HostProperties` tag
    /// `name` attribute or as a `ReportItem` child element name.
    pub fn nessus_id(self) -> &'static str {
        match self {
            ScanField::RiskFactor => "risk_factor",
            ScanField::CvssBaseScore => "cvss_base_score",
            ScanField::HostIp => "host-ip",
            ScanField::HostFqdn => "host-fqdn",
            ScanField::Port => "port",
            ScanField::OperatingSystem => "operating-system",
            ScanField::PluginName => "plugin_name",
            ScanField::Cve => "cve",
        }
    }

    /// Header cell this field is written under.
    pub fn column(self) -> &'static str {
        match self {
            ScanField::RiskFactor => "Severity",
            ScanField::CvssBaseScore => "CVSS Score",
            ScanField::HostIp => "IP Address",
            ScanField::HostFqdn => "FQDN",
            ScanField::Port => "Port",
            ScanField::OperatingSystem => "OS",
            ScanField::PluginName => "Vulnerability",
            ScanField::Cve => "CVE",
        }
    }

    pub fn from_nessus_id(id: &str) -> Option<ScanField> {
        Self::ALL.into_iter().find(|field| field.nessus_id() == id)
    }
}

/// Output header, in fixed order.
pub const CSV_COLUMNS: [&str; 8] = [
    "Severity",
    "CVSS Score",
    "IP Address",
    "FQDN",
    "Port",
    "OS",
    "Vulnerability",
    "CVE",
];

/// One flattened finding: host-level context plus item-level fields. A record
/// with no value for a column serializes that column as an empty cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FindingRecord {
    #[serde(rename = "Severity")]
    pub severity: String,
    #[serde(rename = "CVSS Score")]
    pub cvss_score: String,
    #[serde(rename = "IP Address")]
    pub ip_address: String,
    #[serde(rename = "FQDN")]
    pub fqdn: String,
    #[serde(rename = "Port")]
    pub port: String,
    #[serde(rename = "OS")]
    pub os: String,
    #[serde(rename = "Vulnerability")]
    pub vulnerability: String,
    #[serde(rename = "CVE")]
    pub cve: String,
}

impl FindingRecord {
    pub fn set(&mut self, field: ScanField, value: String) {
        match field {
            ScanField::RiskFactor => self.severity = value,
            ScanField::CvssBaseScore => self.cvss_score = value,
            ScanField::HostIp => self.ip_address = value,
            ScanField::HostFqdn => self.fqdn = value,
            ScanField::Port => self.port = value,
            ScanField::OperatingSystem => self.os = value,
            ScanField::PluginName => self.vulnerability = value,
            ScanField::Cve => self.cve = value,
        }
    }

    pub fn get(&self, field: ScanField) -> &str {
        match field {
            ScanField::RiskFactor => &self.severity,
            ScanField::CvssBaseScore => &self.cvss_score,
            ScanField::HostIp => &self.ip_address,
            ScanField::HostFqdn => &self.fqdn,
            ScanField::Port => &self.port,
            ScanField::OperatingSystem => &self.os,
            ScanField::PluginName => &self.vulnerability,
            ScanField::Cve => &self.cve,
        }
    }
}
