//! Category rule set: tagged variants with compiled patterns.

use regex::Regex;

use crate::config::CategoryConfig;

/// How a category match affects the category gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Whitelist,
    Blacklist,
    Borderline,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Whitelist => "whitelist",
            Self::Blacklist => "blacklist",
            Self::Borderline => "borderline",
        }
    }
}

/// A category the gate recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryTag {
    // Excluded outright.
    Franchise,
    GasStation,
    ConvenienceRetail,
    SkilledTrade,
    Government,
    ECommerce,
    // Never decided automatically.
    FuneralHome,
    FranchiseOffice,
    // Target industries.
    Manufacturing,
    Fabrication,
    Distribution,
    Printing,
    Engineering,
    /// Pattern supplied by configuration.
    Configured(RuleKind),
}

impl CategoryTag {
    pub const BUILT_IN: [CategoryTag; 13] = [
        Self::Franchise,
        Self::GasStation,
        Self::ConvenienceRetail,
        Self::SkilledTrade,
        Self::Government,
        Self::ECommerce,
        Self::FuneralHome,
        Self::FranchiseOffice,
        Self::Manufacturing,
        Self::Fabrication,
        Self::Distribution,
        Self::Printing,
        Self::Engineering,
    ];

    pub fn kind(&self) -> RuleKind {
        match self {
            Self::Franchise
            | Self::GasStation
            | Self::ConvenienceRetail
            | Self::SkilledTrade
            | Self::Government
            | Self::ECommerce => RuleKind::Blacklist,
            Self::FuneralHome | Self::FranchiseOffice => RuleKind::Borderline,
            Self::Manufacturing
            | Self::Fabrication
            | Self::Distribution
            | Self::Printing
            | Self::Engineering => RuleKind::Whitelist,
            Self::Configured(kind) => *kind,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Franchise => "franchise",
            Self::GasStation => "gas_station",
            Self::ConvenienceRetail => "convenience_retail",
            Self::SkilledTrade => "skilled_trade",
            Self::Government => "government",
            Self::ECommerce => "ecommerce",
            Self::FuneralHome => "funeral_home",
            Self::FranchiseOffice => "franchise_office",
            Self::Manufacturing => "manufacturing",
            Self::Fabrication => "fabrication",
            Self::Distribution => "distribution",
            Self::Printing => "printing",
            Self::Engineering => "engineering",
            Self::Configured(_) => "configured",
        }
    }

    /// Built-in patterns, matched against lower-case, single-spaced text.
    fn patterns(&self) -> &'static [&'static str] {
        match self {
            Self::Franchise => &[
                r"\btim hortons?\b",
                r"\bmcdonald ?s\b",
                r"\bsubway\b",
                r"\bstarbucks\b",
                r"\bpizza pizza\b",
                r"\bburger king\b",
                r"\bwendy ?s\b",
                r"\bfast food\b",
                r"\bmeal takeaway\b",
                r"\bfranchisee?\b",
            ],
            Self::GasStation => &[
                r"\bgas station\b",
                r"\bgas bar\b",
                r"\bpetro canada\b",
                r"\besso\b",
                r"\bshell\b",
                r"\bultramar\b",
                r"\bfuel\b",
            ],
            Self::ConvenienceRetail => &[
                r"\bconvenience\b",
                r"\bvariety\b",
                r"\bmini ?mart\b",
                r"\bcorner store\b",
                r"\bdepanneur\b",
                r"\bmac ?s\b",
                r"\bcircle k\b",
            ],
            Self::SkilledTrade => &[
                r"\bplumb(er|ers|ing)\b",
                r"\belectrician\b",
                r"\belectrical contractor\b",
                r"\bhvac\b",
                r"\broof(er|ers|ing)\b",
                r"\blandscap(er|ers|ing)\b",
                r"\bpaint(er|ers)\b",
                r"\bhandyman\b",
                r"\bcarpent(er|ers|ry)\b",
            ],
            Self::Government => &[
                r"\bcity of\b",
                r"\btown of\b",
                r"\bministry\b",
                r"\bservice ?ontario\b",
                r"\bservice canada\b",
                r"\bmunicipal\b",
                r"\blocal government office\b",
                r"\bcity hall\b",
                r"\bcourthouse\b",
                r"\bpost office\b",
            ],
            Self::ECommerce => &[
                r"\bshopify\b",
                r"\betsy\b",
                r"\bamazon seller\b",
                r"\bonline store\b",
                r"\be ?commerce\b",
                r"\bdropship(ping)?\b",
            ],
            Self::FuneralHome => &[
                r"\bfuneral\b",
                r"\bcremation\b",
                r"\bmortuary\b",
                r"\bcemetery\b",
            ],
            Self::FranchiseOffice => &[
                r"\bfranchise (office|development|head office)\b",
                r"\bfranchisor\b",
                r"\bmaster franchise\b",
            ],
            Self::Manufacturing => &[
                r"\bmanufactur(er|ers|ing)\b",
                r"\bmachin(e|ing) shop\b",
                r"\bmachining\b",
                r"\btool and die\b",
                r"\bfoundry\b",
                r"\bplastics?\b",
                r"\bmould(ing)?\b",
                r"\bmold(ing)?\b",
                r"\bindustrial\b",
            ],
            Self::Fabrication => &[
                r"\bfabricat(ion|ors?|ing)\b",
                r"\bmetal ?works\b",
                r"\bsheet metal\b",
                r"\bwelding\b",
                r"\bsteel\b",
            ],
            Self::Distribution => &[
                r"\bdistribut(ion|ors?|ing)\b",
                r"\bwholesal(e|er|ers)\b",
                r"\blogistics\b",
                r"\bwarehous(e|ing)\b",
                r"\bpackaging\b",
            ],
            Self::Printing => &[r"\bprint(ing|ers)\b", r"\blithograph", r"\bsign ?making\b"],
            Self::Engineering => &[
                r"\bengineering\b",
                r"\bautomation\b",
                r"\bprecision\b",
                r"\binstrumentation\b",
            ],
            Self::Configured(_) => &[],
        }
    }
}

/// One compiled pattern and the tag it belongs to.
#[derive(Debug, Clone)]
pub struct CategoryRule {
    pub tag: CategoryTag,
    pub pattern: Regex,
}

/// A pattern hit inside one piece of category text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMatch {
    pub tag: CategoryTag,
    /// The matched text.
    pub term: String,
}

/// Compiled rule set: built-in tags plus configured extras.
#[derive(Debug, Clone)]
pub struct CategoryRules {
    rules: Vec<CategoryRule>,
}

impl CategoryRules {
    pub fn new(extra: &CategoryConfig) -> Result<Self, regex::Error> {
        let mut rules = Vec::new();

        for tag in CategoryTag::BUILT_IN {
            for pattern in tag.patterns() {
                rules.push(CategoryRule {
                    tag,
                    pattern: compile(pattern)?,
                });
            }
        }

        for (kind, patterns) in [
            (RuleKind::Whitelist, &extra.whitelist),
            (RuleKind::Blacklist, &extra.blacklist),
            (RuleKind::Borderline, &extra.borderline),
        ] {
            for pattern in patterns {
                rules.push(CategoryRule {
                    tag: CategoryTag::Configured(kind),
                    pattern: compile(pattern)?,
                });
            }
        }

        Ok(Self { rules })
    }

    /// Every rule that matches `text`, at most one hit per tag.
    pub fn matches(&self, text: &str) -> Vec<CategoryMatch> {
        let mut hits: Vec<CategoryMatch> = Vec::new();
        for rule in &self.rules {
            if hits.iter().any(|h| h.tag == rule.tag) {
                continue;
            }
            if let Some(m) = rule.pattern.find(text) {
                hits.push(CategoryMatch {
                    tag: rule.tag,
                    term: m.as_str().to_string(),
                });
            }
        }
        hits
    }
}

fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("(?i){}", pattern))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(rules: &CategoryRules, text: &str) -> Vec<CategoryTag> {
        rules.matches(text).into_iter().map(|m| m.tag).collect()
    }

    #[test]
    fn built_in_patterns_compile() {
        let rules = CategoryRules::new(&CategoryConfig::default()).unwrap();
        assert!(tags(&rules, "eastgate variety").contains(&CategoryTag::ConvenienceRetail));
        assert!(tags(&rules, "convenience store").contains(&CategoryTag::ConvenienceRetail));
        assert_eq!(tags(&rules, "smith funeral home"), vec![CategoryTag::FuneralHome]);
        assert!(tags(&rules, "mountain plumbing").contains(&CategoryTag::SkilledTrade));
        assert!(tags(&rules, "the bakery").is_empty());
    }

    #[test]
    fn both_kinds_can_match_one_name() {
        let rules = CategoryRules::new(&CategoryConfig::default()).unwrap();
        let found = tags(&rules, "hamilton convenience manufacturing");
        assert!(found.contains(&CategoryTag::ConvenienceRetail));
        assert!(found.contains(&CategoryTag::Manufacturing));
    }

    #[test]
    fn configured_patterns_carry_their_kind() {
        let rules = CategoryRules::new(&CategoryConfig {
            whitelist: vec![r"\bbrewery\b".into()],
            blacklist: vec![],
            borderline: vec![r"\bcannabis\b".into()],
        })
        .unwrap();

        let hits = rules.matches("Steeltown Brewery");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].tag.kind(), RuleKind::Whitelist);
        assert_eq!(hits[0].term, "Brewery");
        assert_eq!(
            tags(&rules, "cannabis retail"),
            vec![CategoryTag::Configured(RuleKind::Borderline)]
        );
    }

    #[test]
    fn kinds_are_exhaustive() {
        for tag in CategoryTag::BUILT_IN {
            assert!(!tag.patterns().is_empty(), "{} has no patterns", tag.as_str());
        }
    }
}
