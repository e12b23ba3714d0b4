use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyEntry {
    /// Canonical display name
    pub name: String,
    pub symbol: String,
    pub sector: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl CompanyEntry {
    pub fn surface_forms(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorEntry {
    pub name: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegulatorEntry {
    pub name: String,
    pub keywords: Vec<String>,
    /// Sectors whose listed companies move with this regulator's decisions
    pub sectors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEntry {
    pub name: String,
    pub keywords: Vec<String>,
}

/// Company/sector/regulator/event vocabulary used for keyword matching and impact mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordTable {
    pub companies: Vec<CompanyEntry>,
    pub sectors: Vec<SectorEntry>,
    pub regulators: Vec<RegulatorEntry>,
    pub events: Vec<EventEntry>,
}

impl KeywordTable {
    pub fn company(&self, name: &str) -> Option<&CompanyEntry> {
        let name = name.trim();
        self.companies
            .iter()
            .find(|c| c.surface_forms().any(|form| form.eq_ignore_ascii_case(name)))
    }

    pub fn sector(&self, name: &str) -> Option<&SectorEntry> {
        self.sectors.iter().find(|s| s.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn regulator(&self, name: &str) -> Option<&RegulatorEntry> {
        let name = name.trim();
        self.regulators.iter().find(|r| {
            r.name.eq_ignore_ascii_case(name) || r.keywords.iter().any(|k| k.eq_ignore_ascii_case(name))
        })
    }

    pub fn symbol_for(&self, company: &str) -> Option<&str> {
        self.company(company).map(|c| c.symbol.as_str())
    }

    pub fn companies_in_sector(&self, sector: &str) -> Vec<&CompanyEntry> {
        self.companies
            .iter()
            .filter(|c| c.sector.eq_ignore_ascii_case(sector.trim()))
            .collect()
    }

    /// Distinct symbols of a sector, in table order.
    pub fn symbols_in_sector(&self, sector: &str) -> Vec<&str> {
        let mut symbols: Vec<&str> = Vec::new();
        for company in self.companies_in_sector(sector) {
            if !symbols.contains(&company.symbol.as_str()) {
                symbols.push(&company.symbol);
            }
        }
        symbols
    }

    /// Cross-reference problems between the tables; empty when consistent.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for company in &self.companies {
            if self.sector(&company.sector).is_none() {
                problems.push(format!(
                    "company '{}' ({}) maps to unknown sector '{}'",
                    company.name, company.symbol, company.sector
                ));
            }
        }
        for sector in &self.sectors {
            if self.symbols_in_sector(&sector.name).is_empty() {
                problems.push(format!("sector '{}' has no symbols", sector.name));
            }
        }
        for regulator in &self.regulators {
            for sector in &regulator.sectors {
                if self.sector(sector).is_none() {
                    problems.push(format!(
                        "regulator '{}' oversees unknown sector '{}'",
                        regulator.name, sector
                    ));
                }
            }
        }

        problems
    }
}

fn company(name: &str, symbol: &str, sector: &str, aliases: &[&str]) -> CompanyEntry {
    CompanyEntry {
        name: name.to_string(),
        symbol: symbol.to_string(),
        sector: sector.to_string(),
        aliases: aliases.iter().map(|a| a.to_string()).collect(),
    }
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self {
            companies: vec![
                company("HDFC Bank", "HDFCBANK", "Banking", &["HDFC"]),
                company("ICICI Bank", "ICICIBANK", "Banking", &["ICICI"]),
                company("State Bank of India", "SBIN", "Banking", &["SBI"]),
                company("Axis Bank", "AXISBANK", "Banking", &[]),
                company("Kotak Mahindra Bank", "KOTAKBANK", "Banking", &["Kotak Bank"]),
                company("Punjab National Bank", "PNB", "Banking", &[]),
                company("Bank of Baroda", "BANKBARODA", "Banking", &[]),
                company("IndusInd Bank", "INDUSINDBK", "Banking", &[]),
                company("Tata Consultancy Services", "TCS", "IT", &["TCS"]),
                company("Infosys", "INFY", "IT", &[]),
                company("Wipro", "WIPRO", "IT", &[]),
                company("HCL Technologies", "HCLTECH", "IT", &["HCL"]),
                company("Tech Mahindra", "TECHM", "IT", &[]),
                company("Sun Pharma", "SUNPHARMA", "Pharma", &["Sun Pharmaceutical"]),
                company("Dr. Reddy's", "DRREDDY", "Pharma", &["Dr Reddy's"]),
                company("Cipla", "CIPLA", "Pharma", &[]),
                company("Lupin", "LUPIN", "Pharma", &[]),
                company("Maruti Suzuki", "MARUTI", "Auto", &[]),
                company("Tata Motors", "TATAMOTORS", "Auto", &[]),
                company("Mahindra & Mahindra", "M&M", "Auto", &["Mahindra"]),
                company("Bajaj Auto", "BAJAJ-AUTO", "Auto", &[]),
                company("Hindustan Unilever", "HINDUNILVR", "FMCG", &["HUL"]),
                company("ITC", "ITC", "FMCG", &[]),
                company("Nestle", "NESTLEIND", "FMCG", &[]),
                company("Reliance Industries", "RELIANCE", "Energy", &["Reliance"]),
                company("ONGC", "ONGC", "Energy", &["Oil and Natural Gas Corporation"]),
            ],
            sectors: vec![
                SectorEntry {
                    name: "Banking".to_string(),
                    keywords: words(&["bank", "banks", "banking", "lender", "lenders", "loan", "loans", "credit", "deposit", "deposits", "NPA", "NPAs", "bad loans"]),
                },
                SectorEntry {
                    name: "IT".to_string(),
                    keywords: words(&["IT", "software", "technology", "digital", "tech", "IT services", "outsourcing"]),
                },
                SectorEntry {
                    name: "Pharma".to_string(),
                    keywords: words(&["pharma", "pharmaceutical", "drug", "drugs", "medicine", "FDA", "clinical trial"]),
                },
                SectorEntry {
                    name: "Auto".to_string(),
                    keywords: words(&["automobile", "auto", "vehicle", "vehicles", "car", "cars", "SUV", "two-wheeler"]),
                },
                SectorEntry {
                    name: "FMCG".to_string(),
                    keywords: words(&["FMCG", "consumer goods", "fast-moving", "retail"]),
                },
                SectorEntry {
                    name: "Energy".to_string(),
                    keywords: words(&["oil", "gas", "petroleum", "refinery", "crude", "energy"]),
                },
            ],
            regulators: vec![
                RegulatorEntry {
                    name: "RBI".to_string(),
                    keywords: words(&["RBI", "Reserve Bank", "Reserve Bank of India", "central bank", "repo rate", "CRR", "SLR"]),
                    sectors: words(&["Banking"]),
                },
                RegulatorEntry {
                    name: "SEBI".to_string(),
                    keywords: words(&["SEBI", "Securities and Exchange Board", "market regulator", "insider trading"]),
                    sectors: words(&["Banking", "IT"]),
                },
                RegulatorEntry {
                    name: "FED".to_string(),
                    keywords: words(&["Federal Reserve", "FOMC", "US central bank"]),
                    sectors: words(&["IT"]),
                },
                RegulatorEntry {
                    name: "IRDAI".to_string(),
                    keywords: words(&["IRDAI", "Insurance Regulatory", "insurance regulator"]),
                    sectors: words(&["Banking"]),
                },
            ],
            events: vec![
                EventEntry {
                    name: "rate hike".to_string(),
                    keywords: words(&["rate hike", "rate hikes", "hikes repo rate", "hiked repo rate", "hikes rates", "hiked rates", "increases repo rate", "raised the repo rate", "raised the policy rate", "rate increase"]),
                },
                EventEntry {
                    name: "rate cut".to_string(),
                    keywords: words(&["rate cut", "rate cuts", "cuts repo rate", "reduced the repo rate"]),
                },
                EventEntry {
                    name: "dividend".to_string(),
                    keywords: words(&["dividend", "dividends", "payout"]),
                },
                EventEntry {
                    name: "acquisition".to_string(),
                    keywords: words(&["acquisition", "acquires", "acquired", "merger", "takeover"]),
                },
                EventEntry {
                    name: "earnings".to_string(),
                    keywords: words(&["earnings", "quarterly results", "net profit", "Q1", "Q2", "Q3", "Q4"]),
                },
                EventEntry {
                    name: "contract win".to_string(),
                    keywords: words(&["wins contract", "secured a contract", "secures contract", "contract"]),
                },
                EventEntry {
                    name: "regulation".to_string(),
                    keywords: words(&["guidelines", "regulations", "compliance"]),
                },
            ],
        }
    }
}
