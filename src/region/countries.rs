use once_cell::sync::Lazy;
use regex::Regex;

/// ISO 3166 alpha-3 code paired with the name variants it answers to, single
/// words and short phrases alike. Patterns are matched against the lowercase
/// ASCII form of a token or phrase, single-spaced and anchored at both ends.
const COUNTRY_NAMES: &[(&str, &str)] = &[
    ("AFG", "afghanistan"),
    ("ALB", "albania"),
    ("DZA", "algeria"),
    ("AND", "andorra"),
    ("AGO", "angola"),
    ("ATG", "antigua|barbuda|antigua and barbuda"),
    ("ARG", "argentina"),
    ("ARM", "armenia"),
    ("AUS", "australia"),
    ("AUT", "austria"),
    ("AZE", "azerbaijan"),
    ("BHS", "bahamas"),
    ("BHR", "bahrain"),
    ("BGD", "bangladesh"),
    ("BRB", "barbados"),
    ("BLR", "belarus|byelorussia"),
    ("BEL", "belgium"),
    ("BLZ", "belize"),
    ("BEN", "benin|dahomey"),
    ("BTN", "bhutan"),
    ("BOL", "bolivia"),
    ("BIH", "bosnia|herzegovina|bosnia and herzegovina"),
    ("BWA", "botswana"),
    ("BRA", "brazil|brasil"),
    ("BRN", "brunei"),
    ("BGR", "bulgaria"),
    ("BFA", "burkina|burkina faso"),
    ("BDI", "burundi"),
    ("KHM", "cambodia|kampuchea"),
    ("CMR", "cameroon"),
    ("CAN", "canada"),
    ("TCD", "chad"),
    ("CHL", "chile"),
    ("CHN", "china"),
    ("COL", "colombia"),
    ("COM", "comoros"),
    ("COG", "congo|republic of (?:the )?congo|congo brazzaville"),
    ("COD", "zaire|democratic republic of (?:the )?congo|congo kinshasa"),
    ("CIV", "(?:d'?)?ivoire|ivory|ivory coast|cote d'?ivoire"),
    ("HRV", "croatia"),
    ("CUB", "cuba"),
    ("CYP", "cyprus"),
    ("CZE", "czechia|czech|czech republic"),
    ("DNK", "denmark"),
    ("DJI", "djibouti"),
    ("DMA", "dominica"),
    ("ECU", "ecuador"),
    ("EGY", "egypt"),
    ("ERI", "eritrea"),
    ("EST", "estonia"),
    ("SWZ", "eswatini|swaziland"),
    ("ETH", "ethiopia"),
    ("FJI", "fiji"),
    ("FIN", "finland"),
    ("FRA", "france"),
    ("GAB", "gabon"),
    ("GMB", "gambia"),
    ("GEO", "georgia"),
    ("DEU", "germany"),
    ("GHA", "ghana"),
    ("GRC", "greece"),
    ("GRD", "grenada"),
    ("GTM", "guatemala"),
    ("GIN", "guinea"),
    ("GNB", "bissau|guinea bissau"),
    ("GUY", "guyana"),
    ("HTI", "haiti"),
    ("HND", "honduras"),
    ("HUN", "hungary"),
    ("ISL", "iceland"),
    ("IND", "india"),
    ("IDN", "indonesia"),
    ("IRN", "iran|persia"),
    ("IRQ", "iraq"),
    ("IRL", "ireland"),
    ("ISR", "israel"),
    ("ITA", "italy"),
    ("JAM", "jamaica"),
    ("JPN", "japan"),
    ("JOR", "jordan"),
    ("KAZ", "kazakhstan"),
    ("KEN", "kenya"),
    ("KIR", "kiribati"),
    ("XKX", "kosovo"),
    ("KWT", "kuwait"),
    ("KGZ", "kyrgyzstan|kirghizia"),
    ("LAO", "laos"),
    ("LVA", "latvia"),
    ("LBN", "lebanon"),
    ("LSO", "lesotho"),
    ("LBR", "liberia"),
    ("LBY", "libya"),
    ("LIE", "liechtenstein"),
    ("LTU", "lithuania"),
    ("LUX", "luxembourg"),
    ("MDG", "madagascar"),
    ("MWI", "malawi"),
    ("MYS", "malaysia"),
    ("MDV", "maldives"),
    ("MLI", "mali"),
    ("MLT", "malta"),
    ("MRT", "mauritania"),
    ("MUS", "mauritius"),
    ("MEX", "mexico"),
    ("FSM", "micronesia|federated states of micronesia"),
    ("MDA", "moldova"),
    ("MCO", "monaco"),
    ("MNG", "mongolia"),
    ("MNE", "montenegro"),
    ("MAR", "morocco"),
    ("MOZ", "mozambique"),
    ("MMR", "myanmar|burma"),
    ("NAM", "namibia"),
    ("NRU", "nauru"),
    ("NPL", "nepal"),
    ("NLD", "netherlands|holland|the netherlands"),
    ("NIC", "nicaragua"),
    ("NER", "niger"),
    ("NGA", "nigeria"),
    ("MKD", "macedonia|north macedonia"),
    ("NOR", "norway"),
    ("OMN", "oman"),
    ("PAK", "pakistan"),
    ("PLW", "palau"),
    ("PSE", "palestine|gaza|west bank|gaza strip"),
    ("PAN", "panama"),
    ("PNG", "papua|papua new guinea"),
    ("PRY", "paraguay"),
    ("PER", "peru"),
    ("PHL", "philippines"),
    ("POL", "poland"),
    ("PRT", "portugal"),
    ("QAT", "qatar"),
    ("ROU", "romania|rumania"),
    ("RUS", "russia"),
    ("RWA", "rwanda"),
    ("KNA", "kitts|nevis|saint kitts and nevis|st kitts and nevis"),
    ("VCT", "vincent|grenadines|saint vincent and the grenadines"),
    ("WSM", "samoa"),
    ("STP", "principe|sao tome and principe"),
    ("SAU", "saudi|saudi arabia"),
    ("SEN", "senegal"),
    ("SRB", "serbia"),
    ("SYC", "seychelles"),
    ("SLE", "sierra|sierra leone"),
    ("SGP", "singapore"),
    ("SVK", "slovakia"),
    ("SVN", "slovenia"),
    ("SOM", "somalia"),
    ("ESP", "spain"),
    ("SDN", "sudan"),
    ("SUR", "suriname"),
    ("SWE", "sweden"),
    ("CHE", "switzerland"),
    ("SYR", "syria"),
    ("TWN", "taiwan"),
    ("TJK", "tajikistan"),
    ("TZA", "tanzania"),
    ("THA", "thailand"),
    ("TLS", "timor|leste|east timor|timor leste"),
    ("TGO", "togo"),
    ("TON", "tonga"),
    ("TTO", "trinidad|tobago|trinidad and tobago"),
    ("TUN", "tunisia"),
    ("TUR", "turkey|turkiye"),
    ("TKM", "turkmenistan"),
    ("TUV", "tuvalu"),
    ("UGA", "uganda"),
    ("UKR", "ukraine"),
    ("ARE", "emirates|united arab emirates"),
    ("GBR", "britain|great britain|united kingdom"),
    ("URY", "uruguay"),
    ("UZB", "uzbekistan"),
    ("VUT", "vanuatu"),
    ("VAT", "vatican"),
    ("VEN", "venezuela"),
    ("VNM", "vietnam"),
    ("YEM", "yemen"),
    ("ZMB", "zambia"),
    ("ZWE", "zimbabwe"),
    ("CPV", "cape verde|cabo verde"),
    ("CAF", "central african republic"),
    ("CRI", "costa rica"),
    ("DOM", "dominican republic"),
    ("SLV", "el salvador"),
    ("GNQ", "equatorial guinea"),
    ("KOR", "korea|south korea|republic of korea"),
    ("PRK", "north korea"),
    ("MHL", "marshall islands"),
    ("NZL", "new zealand"),
    ("LCA", "saint lucia|st lucia"),
    ("SMR", "san marino"),
    ("SLB", "solomon islands"),
    ("ZAF", "south africa"),
    ("SSD", "south sudan"),
    ("LKA", "sri lanka"),
    ("USA", "united states|united states of america"),
];

/// Abbreviations only count when written in capitals, so `US` resolves and
/// the pronoun `us` does not.
const COUNTRY_ABBREVIATIONS: &[(&str, &str)] = &[
    ("USA", "US|USA"),
    ("GBR", "UK"),
    ("ARE", "UAE"),
    ("COD", "DRC|DROC"),
    ("PRK", "DPRK"),
    ("KOR", "ROK"),
    ("CHN", "PRC"),
    ("SAU", "KSA"),
    ("CAF", "CAR"),
];

pub struct VocabularyEntry {
    pub pattern: Regex,
    pub code: &'static str,
}

fn compile(table: &[(&'static str, &'static str)]) -> Vec<VocabularyEntry> {
    table
        .iter()
        .filter_map(|&(code, pattern)| {
            match Regex::new(&format!("^(?:{})$", pattern)) {
                Ok(pattern) => Some(VocabularyEntry { pattern, code }),
                Err(e) => {
                    tracing::error!("Failed to compile vocabulary pattern for {}: {:?}", code, e);
                    None
                }
            }
        })
        .collect()
}

pub static COUNTRY_VOCABULARY: Lazy<Vec<VocabularyEntry>> = Lazy::new(|| compile(COUNTRY_NAMES));

pub static ABBREVIATION_VOCABULARY: Lazy<Vec<VocabularyEntry>> = Lazy::new(|| compile(COUNTRY_ABBREVIATIONS));
