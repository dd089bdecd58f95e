use super::domain::Language;

/// Label set for one export language.
#[derive(Debug)]
pub struct Labels {
    pub report_title: &'static str,
    pub survey: &'static str,
    pub wave: &'static str,
    pub as_of: &'static str,
    pub balance_score: &'static str,
    pub risk_index: &'static str,
    pub psych_safety: &'static str,
    pub values_alignment: &'static str,
    pub respondents: &'static str,
    pub initiatives: &'static str,
    pub title: &'static str,
    pub owner: &'static str,
    pub priority: &'static str,
    pub method_title: &'static str,
    pub method_body: &'static str,
    pub suppressed_notice: &'static str,
    pub key_scores: &'static str,
    pub cvf_chart: &'static str,
    pub heatmap_chart: &'static str,
    pub chart_unavailable: &'static str,
    pub pulse_schedule: &'static str,
    pub pulse_entry: &'static str,
    pub next_steps: &'static str,
    pub next_step_items: [&'static str; 3],
    pub no_initiatives: &'static str,
    pub page: &'static str,
}

const EN: Labels = Labels {
    report_title: "Corporate Culture Intelligence",
    survey: "Survey",
    wave: "Wave",
    as_of: "As of",
    balance_score: "Balance Score",
    risk_index: "Risk Index",
    psych_safety: "Psychological Safety",
    values_alignment: "Values Alignment",
    respondents: "Respondents",
    initiatives: "Top Initiatives",
    title: "Initiative",
    owner: "Owner",
    priority: "Priority",
    method_title: "Method & Anonymity",
    method_body: "Scores are aggregated per wave. Groups with fewer than 7 respondents are never reported.",
    suppressed_notice: "This group is below the anonymity floor; scores are hidden.",
    key_scores: "Key Scores",
    cvf_chart: "Competing Values Profile",
    heatmap_chart: "Cultural Web Heatmap",
    chart_unavailable: "Chart not available",
    pulse_schedule: "Pulse Schedule",
    pulse_entry: "Pulse check",
    next_steps: "Next Steps",
    next_step_items: [
        "Share results with leadership and team leads",
        "Confirm owners and timelines for the top initiatives",
        "Run the first pulse check and compare against this wave",
    ],
    no_initiatives: "No initiatives recorded",
    page: "Page",
};

const AR: Labels = Labels {
    report_title: "ذكاء الثقافة المؤسسية",
    survey: "الاستبيان",
    wave: "الموجة",
    as_of: "بتاريخ",
    balance_score: "درجة التوازن",
    risk_index: "مؤشر المخاطر",
    psych_safety: "الأمان النفسي",
    values_alignment: "مواءمة القيم",
    respondents: "المشاركون",
    initiatives: "أهم المبادرات",
    title: "المبادرة",
    owner: "المسؤول",
    priority: "الأولوية",
    method_title: "المنهجية والسرية",
    method_body: "تُجمع الدرجات لكل موجة، ولا يتم الإبلاغ عن المجموعات التي تقل عن 7 مشاركين.",
    suppressed_notice: "هذه المجموعة دون حد السرية؛ الدرجات محجوبة.",
    key_scores: "الدرجات الرئيسية",
    cvf_chart: "ملف القيم المتنافسة",
    heatmap_chart: "خريطة الشبكة الثقافية",
    chart_unavailable: "الرسم البياني غير متاح",
    pulse_schedule: "جدول قياس النبض",
    pulse_entry: "قياس النبض",
    next_steps: "الخطوات التالية",
    next_step_items: [
        "مشاركة النتائج مع القيادة وقادة الفرق",
        "تأكيد المسؤولين والجداول الزمنية لأهم المبادرات",
        "إجراء أول قياس نبض ومقارنته بهذه الموجة",
    ],
    no_initiatives: "لا توجد مبادرات مسجلة",
    page: "صفحة",
};

const DISCLAIMER_EN: [&str; 2] = [
    "Aggregated culture survey results; groups under 7 respondents are suppressed to protect anonymity.",
    "Not legal advice. AI-assisted analysis; human review recommended before acting.",
];

const DISCLAIMER_AR: [&str; 2] = [
    "نتائج مجمّعة لاستبيان الثقافة المؤسسية؛ تُحجب المجموعات التي تقل عن 7 مشاركين لحماية السرية.",
    "هذه ليست استشارة قانونية. التحليل بمساعدة الذكاء الاصطناعي ويُنصح بالمراجعة البشرية قبل أي إجراء.",
];

pub fn labels(language: Language) -> &'static Labels {
    match language {
        Language::En => &EN,
        Language::Ar => &AR,
    }
}

pub fn disclaimer(language: Language) -> &'static [&'static str] {
    match language {
        Language::En => &DISCLAIMER_EN,
        Language::Ar => &DISCLAIMER_AR,
    }
}

/// Shown for scores that are null or suppressed.
pub const MISSING_SCORE: &str = "—";

/// Score rendered to one decimal, or the missing marker.
pub fn format_score(value: Option<f64>) -> String {
    match value {
        Some(value) if value.is_finite() => format!("{value:.1}"),
        _ => MISSING_SCORE.to_string(),
    }
}
