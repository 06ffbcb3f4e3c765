//! Built-in keyword tables
//!
//! Literal lists are tried first, in order; the structural patterns only run
//! when no literal hit. Both lists are matched case-insensitively.

pub(super) const UAE_KEYWORDS: &[&str] = &[
    // English
    "e-invoice",
    "e-invoices",
    "e-invoicing",
    "einvoice",
    "einvoices",
    "einvoicing",
    "electronic invoice",
    "electronic invoices",
    "electronic invoicing",
    "digital invoice",
    "digital invoices",
    "digital invoicing",
    "online invoice",
    "online invoices",
    "online invoicing",
    "tax invoice",
    "tax invoices",
    "vat invoice",
    "vat invoices",
    "electronic billing",
    "digital billing",
    "online billing",
    "e-billing",
    // Arabic
    "فاتورة إلكترونية",
    "الفواتير الإلكترونية",
    "نظام الفوترة الإلكترونية",
    "الفاتورة الرقمية",
    "الفوترة الرقمية",
    "فاتورة ضريبية إلكترونية",
    // Technical terms
    "peppol",
    "peppol network",
    "peppol authority",
    "peppol access point",
    "ubl",
    "universal business language",
    "xml invoice",
    "xml invoices",
    "xml invoicing",
    "structured invoice",
    "structured invoices",
    "invoice automation",
    "automated invoicing",
    "invoice digitization",
    "invoice digitisation",
    "paperless invoicing",
    "paperless invoice",
    "e-tax invoice",
    "e-tax invoices",
    // GCC
    "zatca",
    "fatoora",
];

pub(super) const UAE_PATTERNS: &[&str] = &[
    r"\be[\s-]invoices?\b",
    r"\be[\s-]invoicing\b",
    r"\be[\s-]billing\b",
    r"\be[\s-]tax\b",
    r"\b(electronic|digital|online)\s+(invoice|invoicing|billing)e?s?\b",
    r"\bpeppol\b",
    r"\b(xml|ubl)[\s-]?(invoice|invoicing)e?s?\b",
    r"\b(structured)[\s-]?(invoice)e?s?\b",
    r"فاتورة\s*إلكترونية",
    r"الفواتير\s*الإلكترونية",
    r"الفوترة\s*الإلكترونية",
    r"نظام\s*الفوترة",
    r"\b(tax|vat)[\s-]?(invoice)e?s?\b",
    r"\b(zatca|fatoora)\b",
];

pub(super) const BELGIUM_KEYWORDS: &[&str] = &[
    // English
    "e-invoicing",
    "e-invoice",
    "electronic invoice",
    "electronic invoicing",
    "digital invoice",
    "digital invoicing",
    "vat invoice",
    "electronic billing",
    "e-billing",
    "peppol",
    "ubl",
    "xml invoice",
    "structured invoice",
    "invoice automation",
    // French
    "facturation électronique",
    "facture électronique",
    "e-facturation",
    "e-facture",
    "factures électroniques",
    "facture numérique",
    "facturation numérique",
    "facture digitale",
    "facturation digitale",
    "facture xml",
    "facture structurée",
    // Dutch
    "elektronische facturering",
    "elektronische factureren",
    "elektronisch factureren",
    "elektronische factuur",
    "elektronische facturatie",
    "e-facturering",
    "e-factureren",
    "e-factuur",
    "e-facturen",
    "digitale facturering",
    "digitale factuur",
    "gestructureerde factuur",
    "xml factuur",
    // German
    "elektronische rechnung",
    "e-rechnung",
    "digitale rechnung",
    "elektronische rechnungsstellung",
    "xml rechnung",
    "strukturierte rechnung",
    "rechnungsautomatisierung",
];

pub(super) const BELGIUM_PATTERNS: &[&str] = &[
    r"\be[\s-]invoic(e|es|ing)\b",
    r"\b(electronic|digital)\s+(invoice|invoicing|billing)e?s?\b",
    r"\bpeppol\b",
    r"\b(xml|ubl)[\s-]?(invoice|invoicing|facture|factuur|rechnung)e?s?\b",
    r"\be[\s-]factur(e|es|ation|atie|ering|eren|en)\b",
    r"\be[\s-]factuur\b",
    r"\bfactur(e|es|ation)\s+(électroniques?|numériques?|digitales?)\b",
    r"\belektronische?\s+factu(ur|ren|rering|ratie|reren)\b",
    r"\be[\s-]rechnungs?\b",
    r"\belektronische[nr]?\s+rechnung(en|sstellung)?\b",
];
