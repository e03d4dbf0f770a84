//! Default symbol universes per collector.
//!
//! Sizes differ on purpose: each list is bounded by its provider's free-tier
//! quota (Alpha Vantage allows 25 calls a day, Polygon 5 a minute).

/// Large caps and index ETFs, 15 symbols.
pub const ALPHA_VANTAGE: &[&str] = &[
    "AAPL", "GOOGL", "MSFT", "AMZN", "NVDA", "SPY", "QQQ", "VTI", "JPM", "BAC",
    "V", "JNJ", "UNH", "WMT", "XOM",
];

/// Most traded names, 14 symbols.
pub const POLYGON: &[&str] = &[
    "AAPL", "GOOGL", "MSFT", "AMZN", "NVDA", "TSLA", "SPY", "QQQ", "VTI", "JPM",
    "BAC", "V", "JNJ", "PG",
];

/// NYSE/NASDAQ coverage by sector, 445 symbols.
pub const FINNHUB: &[&str] = &[
    "AAPL", "MSFT", "GOOGL", "GOOG", "AMZN", "NVDA", "META", "TSLA", "NFLX", "ADBE",
    "CRM", "ORCL", "INTC", "AMD", "QCOM", "TXN", "AVGO", "COST", "CSCO", "AMAT",
    "MU", "LRCX", "NXPI", "ADI", "MRVL", "KLAC", "CDNS", "SNPS", "FTNT", "CHKP",
    "ZM", "DOCU", "SPLK", "WDAY", "OKTA", "CRWD", "PANW", "NET", "DDOG", "ESTC",
    "MDB", "SNOW", "COUP", "NOW", "TEAM", "VEEV", "AYX", "PLTR", "RPD", "JPM",
    "BAC", "WFC", "C", "GS", "MS", "BX", "SCHW", "TFC", "PNC", "USB",
    "COF", "AXP", "BLK", "BK", "STT", "MTB", "FITB", "KEY", "CFG", "HBAN",
    "ZION", "RF", "CMA", "WTFC", "TROW", "BEN", "ETFC", "STI", "BMO", "TD",
    "RY", "CM", "BNS", "HSBC", "CS", "UBS", "DB", "BCS", "ING", "SAN",
    "BBVA", "ISP", "BNP", "GLE", "SG", "ACA", "JNJ", "PFE", "UNH", "ABT",
    "TMO", "ABBV", "MRK", "LLY", "BMY", "GILD", "AMGN", "VRTX", "BIIB", "REGN",
    "CELG", "ILMN", "ALXN", "BMRN", "INCY", "EXAS", "FOLD", "SGMO", "BLUE", "IONS",
    "ALNY", "ARWR", "PTCT", "ANAB", "WMT", "HD", "MCD", "NKE", "SBUX", "TGT",
    "LOW", "TJX", "DG", "BBY", "EBAY", "ETSY", "SHOP", "W", "OSTK", "RVLV",
    "FTCH", "REAL", "KO", "PEP", "CL", "PG", "CHD", "EL", "UL", "RBGLY",
    "NSRGY", "PM", "MO", "STZ", "TAP", "BF.B", "SAM", "BUD", "DEO", "HEINY",
    "ASBFY", "CAG", "CPB", "GIS", "HRL", "SJM", "MKC", "TSN", "BG", "ADM",
    "INGR", "BA", "CAT", "GE", "HON", "MMM", "RTX", "LMT", "NOC", "GD",
    "TDG", "TXT", "ITT", "FLS", "FTV", "GGG", "ROP", "AME", "DOV", "PH",
    "PNR", "EMR", "ETN", "FAST", "GWW", "IEX", "IR", "JCI", "SWK", "TTC",
    "WWD", "ZBRA", "ALLE", "AOS", "CSL", "FIX", "FLIR", "HI", "KBR", "MTZ",
    "PGTI", "SNA", "URI", "VMI", "WTS", "XYL", "AWI", "ESE", "XOM", "CVX",
    "COP", "SLB", "EOG", "MPC", "PSX", "VLO", "HES", "MRO", "OVV", "CTRA",
    "PR", "SWN", "MTDR", "NOV", "HP", "PUMP", "NBR", "WTTR", "LPI", "GPOR",
    "PDC", "SM", "PVAC", "CRZO", "OAS", "REI", "WTI", "RRC", "NBL", "NFX",
    "WPX", "CRK", "CXO", "FANG", "PE", "VTLE", "WLL", "CEQP", "KMI", "EP",
    "OKE", "WMB", "TRGP", "ENLC", "ENLK", "USAC", "SRLP", "ET", "LIN", "APD",
    "ECL", "SHW", "PPG", "FCX", "NEM", "VALE", "SCCO", "AA", "X", "STLD",
    "NUE", "CLF", "AKS", "RS", "CMC", "SID", "TMST", "TX", "WOR", "ZEUS",
    "GGB", "DOW", "DD", "CE", "FMC", "ICL", "MOS", "NTR", "CTVA", "ALB",
    "SQM", "LTHM", "LAC", "PLL", "AMT", "PLD", "EQIX", "PSA", "WELL", "SPG",
    "O", "EXR", "AVB", "EQR", "MAA", "UDR", "ESS", "CPT", "AIV", "BRX",
    "BXP", "CBRE", "CWK", "DLR", "EXPI", "FR", "HIW", "IRT", "JBGS", "KIM",
    "KREF", "KW", "LAMR", "MAC", "NHI", "OHI", "PEAK", "REG", "ROIC", "SHO",
    "SLG", "STAG", "STOR", "STWD", "TRNO", "UHT", "VICI", "WH", "WPC", "XHR",
    "ZN", "NEE", "DUK", "SO", "AEP", "EXC", "XEL", "ES", "SRE", "PEG",
    "ED", "EIX", "PCG", "AEE", "ATO", "CMS", "CNP", "D", "DTE", "ETR",
    "FE", "LNT", "NI", "PNW", "SCG", "WEC", "YORW", "AES", "ALE", "AY",
    "AVA", "BKH", "BIP", "CDZI", "CWEN", "ENIA", "ENIC", "IDA", "KEP", "NEP",
    "NRG", "ORA", "VZ", "T", "TMUS", "LUMN", "CMCSA", "DIS", "FOXA", "FOX",
    "NWSA", "NWS", "PARA", "WBD", "NCMI", "SNAP", "PINS", "TWTR", "TWLO", "Z",
    "ZG", "RDFN", "IAC", "MTCH", "ANGI", "VRSK", "ANSS", "DOCN", "DOMO", "UBER",
    "LYFT", "GRUB", "DASH", "ABNB", "BKNG", "EXPE", "TCOM", "TRIP", "MMYT", "NCLH",
    "SPY", "QQQ", "DIA", "IWM", "VTI", "VOO", "VEA", "VWO", "EFA", "EEM",
    "XLF", "XLE", "XLI", "XLK", "XLV",
];

/// S&P 500 subset, 25 symbols.
pub const YAHOO_US: &[&str] = &[
    "AAPL", "MSFT", "GOOGL", "AMZN", "TSLA", "META", "NVDA", "NFLX", "ADBE", "CRM",
    "JPM", "BAC", "WFC", "GS", "MS", "JNJ", "PFE", "UNH", "ABT", "TMO",
    "PG", "KO", "PEP", "WMT", "HD",
];

/// HOSE listings, 52 symbols (requested with a `.VN` suffix).
pub const YAHOO_VN: &[&str] = &[
    "VNM", "VIC", "VHM", "VCB", "HPG", "MSN", "GAS", "VRE", "PLX", "POW",
    "VJC", "VGC", "SAB", "VSH", "VPI", "BID", "CTG", "ACB", "TCB", "MBB",
    "STB", "TPB", "EIB", "HDB", "LPB", "VIB", "SSI", "VCI", "VND", "FPT",
    "CMG", "ELC", "ITD", "VTO", "KDH", "NVL", "PDR", "DXG", "HDG", "CII",
    "CTD", "VCG", "MWG", "PNJ", "FRT", "DGW", "DPM", "DQC", "DRC", "DTA",
    "DVP", "DXS",
];
