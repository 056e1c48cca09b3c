use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::UNKNOWN_MERCHANT;

/// Recognized narration families, in cascade order. `Unrecognized` is the
/// terminal fallback, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrationKind {
    Upi,
    Pos,
    Atm,
    Inb,
    Cash,
    Transfer,
    Unrecognized,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParsedNarration {
    pub merchant: String,
    pub clean_description: String,
    pub kind: NarrationKind,
    pub meta: HashMap<String, String>,
}

impl ParsedNarration {
    fn unrecognized(text: &str) -> Self {
        Self {
            merchant: UNKNOWN_MERCHANT.to_owned(),
            clean_description: text.to_owned(),
            kind: NarrationKind::Unrecognized,
            meta: HashMap::new(),
        }
    }
}

/// Curated merchant aliases. Entry order is a tie-break contract: on text
/// matching several entries, the earliest wins.
pub struct MerchantAliasTable {
    entries: Vec<(String, Vec<String>)>,
}

// Aliases at or below this collapsed length are only matched on word
// boundaries; as substrings they hit inside unrelated longer tokens.
const SHORT_ALIAS_LEN: usize = 3;

impl MerchantAliasTable {
    pub fn new(entries: Vec<(String, Vec<String>)>) -> Self {
        Self { entries }
    }

    /// Resolves any of the candidate fields to a canonical merchant name.
    /// First pass substring-matches on a whitespace-collapsed lowercase form;
    /// a second space-preserving pass recovers the short aliases that need
    /// word boundaries.
    pub fn resolve(&self, fields: &[&str]) -> Option<&str> {
        let collapsed: Vec<String> = fields.iter().map(|f| collapse(f)).collect();
        for (canonical, aliases) in &self.entries {
            for alias in aliases {
                let key = collapse(alias);
                if key.len() > SHORT_ALIAS_LEN && collapsed.iter().any(|f| f.contains(&key)) {
                    return Some(canonical.as_str());
                }
            }
        }

        let worded: Vec<String> = fields.iter().map(|f| word_form(f)).collect();
        for (canonical, aliases) in &self.entries {
            for alias in aliases {
                let key = format!(" {} ", alias.to_lowercase());
                if worded.iter().any(|f| f.contains(&key)) {
                    return Some(canonical.as_str());
                }
            }
        }

        return None;
    }
}

impl Default for MerchantAliasTable {
    fn default() -> Self {
        let entries: Vec<(&str, Vec<&str>)> = vec![
            ("Swiggy Instamart", vec!["swiggy instamart", "instamart"]),
            ("Swiggy", vec!["swiggy"]),
            ("Zomato", vec!["zomato", "zomatofo"]),
            ("PhonePe", vec!["phonepe"]),
            ("Paytm", vec!["paytm"]),
            ("Google Pay", vec!["google pay", "gpay"]),
            ("Uber", vec!["uber", "uber india"]),
            ("Ola", vec!["olacabs", "ola"]),
            ("Rapido", vec!["rapido"]),
            ("Blinkit", vec!["blinkit", "grofers"]),
            ("Zepto", vec!["zepto"]),
            ("BigBasket", vec!["bigbasket", "big basket"]),
            ("Amazon", vec!["amazon", "amzn"]),
            ("Flipkart", vec!["flipkart"]),
            ("Myntra", vec!["myntra"]),
            ("Ajio", vec!["ajio"]),
            ("Netflix", vec!["netflix"]),
            ("Spotify", vec!["spotify"]),
            ("Youtube", vec!["youtube", "google oct"]),
            ("Apple", vec!["apple.com", "itunes"]),
            ("Google", vec!["google"]),
            ("Jio", vec!["reliance jio", "jio"]),
            ("Airtel", vec!["airtel"]),
            ("Vodafone", vec!["vodafone", "vi"]),
            ("Mcdonalds", vec!["mcdonalds", "mcdonald"]),
            ("Starbucks", vec!["starbucks"]),
            ("KFC", vec!["kfc"]),
            ("Burger King", vec!["burger king"]),
            ("Domino's", vec!["dominos", "domino's"]),
            ("Pizza Hut", vec!["pizza hut"]),
            ("Subway", vec!["subway"]),
        ];

        Self::new(
            entries
                .into_iter()
                .map(|(canonical, aliases)| {
                    (
                        canonical.to_owned(),
                        aliases.into_iter().map(str::to_owned).collect(),
                    )
                })
                .collect(),
        )
    }
}

fn collapse(s: &str) -> String {
    s.to_lowercase().chars().filter(|c| !c.is_whitespace()).collect()
}

fn word_form(s: &str) -> String {
    let lower = s.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    format!(" {} ", words.join(" "))
}

// [WDL|DEP] TFR UPI/<DR|CR>/<ref>/<name>/<bank>/<handle>[/<app>]
static UPI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"UPI/([A-Z]+)/([A-Za-z0-9]+)/([^/]+)/([^/]+)/([^/]+)").unwrap());

static POS_REF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{10,})\b").unwrap());
static POS_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?i:POS|ATM|PURCH|PURCHASE|OTHPG|SBIPG|DBTPG)\b").unwrap());

// terminal codes riding in front of the merchant token: 17Pho*, 30RAZ*, Paytm_
static TERMINAL_STAR_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[^*]*\*").unwrap());
static LEADING_DIGITS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+").unwrap());
static STAR_PREFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+\*").unwrap());
static UNDERSCORE_PREFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+_").unwrap());

static ATM_STRIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"ATM WDL|ATM CASH").unwrap());
// machine ids are digits, sometimes followed by a short site code ("1957 SP")
static ATM_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+(?:\s+[A-Z]{1,3})?)\b").unwrap());

static INB_STRIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:WDL|TFR|INB)\b").unwrap());
static BRANCH_TAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bAT \d+.*$").unwrap());

static DEPOSIT_LOCATION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bAT (.+)$").unwrap());
static DEPOSIT_REF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{5,})\b").unwrap());

static NEFT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(NEFT|RTGS)/([^/]+)/([^/]+)/([^/\s]+)").unwrap());

static TRAILING_JUNK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9._\-]+$").unwrap());
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Classifies a raw bank narration into a transaction kind and extracts a
/// merchant label plus a readable summary. The rules form an ordered cascade
/// evaluated top to bottom; several raw formats share prefixes, so the order
/// is load-bearing. Never fails: anything unmatched passes through verbatim.
pub struct NarrationParser {
    aliases: MerchantAliasTable,
}

impl NarrationParser {
    pub fn new(aliases: MerchantAliasTable) -> Self {
        Self { aliases }
    }

    pub fn parse(&self, text: &str) -> ParsedNarration {
        let trimmed = text.trim();

        if let Some(parsed) = self.parse_upi(trimmed) {
            return parsed;
        }
        if let Some(parsed) = self.parse_pos(trimmed) {
            return parsed;
        }
        if let Some(parsed) = self.parse_atm(trimmed) {
            return parsed;
        }
        if let Some(parsed) = self.parse_inb(trimmed) {
            return parsed;
        }
        if let Some(parsed) = self.parse_cash_deposit(trimmed) {
            return parsed;
        }
        if let Some(parsed) = self.parse_neft(trimmed) {
            return parsed;
        }
        if let Some(parsed) = self.parse_generic_transfer(trimmed) {
            return parsed;
        }

        return ParsedNarration::unrecognized(text);
    }

    fn parse_upi(&self, text: &str) -> Option<ParsedNarration> {
        let caps = UPI_RE.captures(text)?;

        let debit = &caps[1] != "CR";
        let reference = caps[2].to_owned();
        let name = clean_name(&caps[3]);
        let bank = caps[4].trim().to_owned();
        let handle = caps[5].trim().to_owned();

        // the channel app rides after the handle when present
        let parts: Vec<&str> = text.split('/').collect();
        let app = parts
            .get(6)
            .and_then(|part| part.split_whitespace().next())
            .map(str::to_owned);

        let merchant = self
            .aliases
            .resolve(&[name.as_str(), handle.as_str(), app.as_deref().unwrap_or("")])
            .map(str::to_owned)
            .unwrap_or_else(|| name.clone());

        let clean_description = if debit {
            format!("UPI Transfer to {merchant}")
        } else {
            format!("UPI Received from {merchant}")
        };

        let mut meta = HashMap::new();
        meta.insert("ref".to_owned(), reference);
        meta.insert("bank".to_owned(), bank);
        meta.insert("handle".to_owned(), handle);
        if let Some(app) = app {
            meta.insert("app".to_owned(), app);
        }

        Some(ParsedNarration {
            merchant,
            clean_description,
            kind: NarrationKind::Upi,
            meta,
        })
    }

    fn parse_pos(&self, text: &str) -> Option<ParsedNarration> {
        if !(text.contains("POS") && text.contains("PURCH")) {
            return None;
        }

        let reference = POS_REF_RE.captures(text).map(|caps| caps[1].to_owned());

        let mut remainder = POS_PREFIX_RE.replace_all(text, " ").into_owned();
        if let Some(reference) = &reference {
            remainder = remainder.replace(reference.as_str(), " ");
        }
        let remainder = WS_RE.replace_all(remainder.trim(), " ").into_owned();

        let mut words: Vec<&str> = remainder.split(' ').filter(|w| !w.is_empty()).collect();
        let mut location = if words.len() > 1 {
            words.pop().map(str::to_owned)
        } else {
            None
        };

        let raw_token = words.join(" ");
        let mut merchant_token = strip_terminal_code(&raw_token);
        if merchant_token.is_empty() {
            // the "location" was the whole merchant after all
            if let Some(loc) = location.take() {
                merchant_token = loc;
            }
        }

        let merchant = self
            .aliases
            .resolve(&[merchant_token.as_str(), raw_token.as_str()])
            .map(str::to_owned)
            .unwrap_or_else(|| merchant_token.clone());

        let clean_description = match (merchant_token.is_empty(), &location) {
            (true, _) => "Card purchase".to_owned(),
            (false, Some(loc)) => format!("Card purchase at {merchant}, {loc}"),
            (false, None) => format!("Card purchase at {merchant}"),
        };

        let mut meta = HashMap::new();
        if let Some(reference) = reference {
            meta.insert("ref".to_owned(), reference);
        }
        if let Some(location) = location {
            meta.insert("location".to_owned(), location);
        }

        Some(ParsedNarration {
            merchant: if merchant.is_empty() {
                UNKNOWN_MERCHANT.to_owned()
            } else {
                merchant
            },
            clean_description,
            kind: NarrationKind::Pos,
            meta,
        })
    }

    fn parse_atm(&self, text: &str) -> Option<ParsedNarration> {
        if !text.contains("ATM WDL") {
            return None;
        }

        let stripped = ATM_STRIP_RE.replace_all(text, " ");
        let stripped = WS_RE.replace_all(stripped.trim(), " ").into_owned();

        let (machine_id, location) = match ATM_ID_RE.captures(&stripped) {
            Some(caps) => {
                let id = caps.get(1).map(|m| m.as_str().to_owned());
                let rest = stripped[caps.get(0).map(|m| m.end()).unwrap_or(0)..]
                    .trim()
                    .to_owned();
                (id, rest)
            }
            None => (None, stripped.clone()),
        };

        let clean_description = if location.is_empty() {
            "ATM Withdrawal".to_owned()
        } else {
            format!("ATM Withdrawal at {location}")
        };

        let mut meta = HashMap::new();
        if let Some(machine_id) = machine_id {
            meta.insert("machine_id".to_owned(), machine_id);
        }
        if !location.is_empty() {
            meta.insert("location".to_owned(), location);
        }

        Some(ParsedNarration {
            merchant: "ATM Withdrawal".to_owned(),
            clean_description,
            kind: NarrationKind::Atm,
            meta,
        })
    }

    fn parse_inb(&self, text: &str) -> Option<ParsedNarration> {
        if !text.contains("INB") {
            return None;
        }

        let stripped = INB_STRIP_RE.replace_all(text, " ");
        let stripped = BRANCH_TAIL_RE.replace(&stripped, "");
        let entity = WS_RE
            .replace_all(stripped.trim(), " ")
            .trim_end_matches("...")
            .trim()
            .to_owned();

        if entity.is_empty() {
            return Some(ParsedNarration {
                merchant: UNKNOWN_MERCHANT.to_owned(),
                clean_description: "Online banking transfer".to_owned(),
                kind: NarrationKind::Inb,
                meta: HashMap::new(),
            });
        }

        let merchant = self
            .aliases
            .resolve(&[entity.as_str()])
            .map(str::to_owned)
            .unwrap_or_else(|| entity.clone());

        // labeled transfers ("Gift to relatives / Friends") read better
        // verbatim than wrapped in a generic sentence
        let clean_description = if entity.to_lowercase().starts_with("gift") {
            entity.clone()
        } else {
            format!("Transfer to {merchant}")
        };

        Some(ParsedNarration {
            merchant,
            clean_description,
            kind: NarrationKind::Inb,
            meta: HashMap::new(),
        })
    }

    fn parse_cash_deposit(&self, text: &str) -> Option<ParsedNarration> {
        let machine = text.contains("CEMTEX");
        if !machine && !text.contains("CASH DEPOSIT") {
            return None;
        }

        let mut meta = HashMap::new();

        if machine {
            // merchant hints can sit anywhere in free-form machine narration
            let merchant = self
                .aliases
                .resolve(&[text])
                .map(str::to_owned)
                .unwrap_or_else(|| UNKNOWN_MERCHANT.to_owned());

            if let Some(caps) = DEPOSIT_REF_RE.captures(text) {
                meta.insert("ref".to_owned(), caps[1].to_owned());
            }

            let clean_description = if merchant == UNKNOWN_MERCHANT {
                "Cash deposit".to_owned()
            } else {
                format!("Cash deposit to {merchant}")
            };

            return Some(ParsedNarration {
                merchant,
                clean_description,
                kind: NarrationKind::Cash,
                meta,
            });
        }

        let location = DEPOSIT_LOCATION_RE
            .captures(text)
            .map(|caps| caps[1].trim().to_owned());

        let clean_description = match &location {
            Some(location) => format!("Cash deposit at {location}"),
            None => "Cash deposit".to_owned(),
        };
        if let Some(location) = location {
            meta.insert("location".to_owned(), location);
        }

        Some(ParsedNarration {
            merchant: UNKNOWN_MERCHANT.to_owned(),
            clean_description,
            kind: NarrationKind::Cash,
            meta,
        })
    }

    fn parse_neft(&self, text: &str) -> Option<ParsedNarration> {
        let caps = NEFT_RE.captures(text)?;

        let channel = caps[1].to_owned();
        let reference = caps[2].trim().to_owned();
        let name = clean_name(&caps[3]);
        let bank = caps[4].trim().to_owned();

        let credit = text.contains("DEP") || text.contains("CR");

        let merchant = self
            .aliases
            .resolve(&[name.as_str(), bank.as_str()])
            .map(str::to_owned)
            .unwrap_or_else(|| name.clone());

        let clean_description = if credit {
            format!("Received from {merchant} via {channel}")
        } else {
            format!("Transfer to {merchant} via {channel}")
        };

        let mut meta = HashMap::new();
        meta.insert("channel".to_owned(), channel);
        meta.insert("ref".to_owned(), reference);
        meta.insert("bank".to_owned(), bank);

        Some(ParsedNarration {
            merchant,
            clean_description,
            kind: NarrationKind::Transfer,
            meta,
        })
    }

    // Last structured rule: plain TFR debits/credits only produce a result
    // when a known merchant is present, so they cannot shadow text the more
    // specific rules left unmatched.
    fn parse_generic_transfer(&self, text: &str) -> Option<ParsedNarration> {
        if !text.contains("TFR") || text.contains("UPI") || text.contains("INB") {
            return None;
        }

        let merchant = self.aliases.resolve(&[text])?.to_owned();

        let credit = text.contains("DEP");
        let clean_description = if credit {
            format!("Received from {merchant}")
        } else {
            format!("Transfer to {merchant}")
        };

        Some(ParsedNarration {
            merchant,
            clean_description,
            kind: NarrationKind::Transfer,
            meta: HashMap::new(),
        })
    }
}

fn clean_name(raw: &str) -> String {
    TRAILING_JUNK_RE.replace(raw.trim(), "").trim().to_owned()
}

fn strip_terminal_code(token: &str) -> String {
    let token = TERMINAL_STAR_CODE_RE.replace(token.trim(), "");
    let token = LEADING_DIGITS_RE.replace(&token, "");
    let token = STAR_PREFIX_RE.replace(&token, "");
    let token = UNDERSCORE_PREFIX_RE.replace(&token, "");
    token.trim().to_owned()
}
