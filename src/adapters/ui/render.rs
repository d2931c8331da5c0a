//! Plain-text tables for leads and opportunities.

use crate::domain::{Lead, Opportunity};

/// Whole-dollar amounts get thousands separators; cents are kept only when present.
pub fn format_amount(amount: Option<f64>) -> String {
    let Some(amount) = amount else {
        return "—".to_string();
    };
    let cents = (amount * 100.0).round() as i64;
    let whole = cents / 100;
    let frac = cents % 100;
    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if frac == 0 {
        format!("${}", grouped)
    } else {
        let frac = format!("{:02}", frac);
        format!("${}.{}", grouped, frac.trim_end_matches('0'))
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

pub fn lead_row(lead: &Lead) -> String {
    format!(
        "{:<6} {:<20} {:<22} {:>5}  {:<10} {}",
        lead.id,
        truncate(&lead.name, 20),
        truncate(&lead.company, 22),
        lead.score,
        lead.status,
        lead.source
    )
}

pub fn leads_table(leads: &[Lead]) -> String {
    if leads.is_empty() {
        return "No leads match the current filters.".to_string();
    }
    let mut out = format!(
        "{:<6} {:<20} {:<22} {:>5}  {:<10} {}\n",
        "ID", "Name", "Company", "Score", "Status", "Source"
    );
    for lead in leads {
        out.push_str(&lead_row(lead));
        out.push('\n');
    }
    out
}

pub fn lead_detail(lead: &Lead) -> String {
    format!(
        "{} ({})\n  Company: {}\n  Email:   {}\n  Source:  {}\n  Score:   {}\n  Status:  {}",
        lead.name, lead.id, lead.company, lead.email, lead.source, lead.score, lead.status
    )
}

pub fn opportunities_table(opportunities: &[Opportunity]) -> String {
    if opportunities.is_empty() {
        return "No opportunities yet. Convert a lead to create one.".to_string();
    }
    let mut out = format!(
        "{:<11} {:<20} {:<22} {:<13} {:>12}  {}\n",
        "ID", "Name", "Account", "Stage", "Amount", "Created"
    );
    for o in opportunities {
        out.push_str(&format!(
            "{:<11} {:<20} {:<22} {:<13} {:>12}  {}\n",
            o.id,
            truncate(&o.name, 20),
            truncate(&o.account_name, 22),
            o.stage,
            format_amount(o.amount),
            o.created_at.format("%Y-%m-%d")
        ));
    }
    out
}
