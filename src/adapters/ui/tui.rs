//! Implements InputPort. Inquire-based interactive console.
//!
//! Pure consumer of ConsoleService: reads projected state, issues commands and
//! prints the user-facing message of any error.

use crate::adapters::ui::progress::with_spinner;
use crate::adapters::ui::render;
use crate::domain::validation::{INVALID_EMAIL_MESSAGE, is_valid_email, parse_amount};
use crate::domain::{
    ConversionRequest, DomainError, Lead, LeadPatch, LeadStatus, OpportunityStage, StatusFilter,
};
use crate::ports::InputPort;
use crate::usecases::ConsoleService;
use async_trait::async_trait;
use crossterm::style::{Color as TermColor, Stylize};
use inquire::error::InquireError;
use inquire::ui::{Color, RenderConfig, Styled};
use inquire::{Select, Text};
use std::fmt;
use std::sync::Arc;

/// Applies the console prompt theme to every subsequent inquire prompt.
pub fn apply_theme() {
    let config = RenderConfig::default()
        .with_prompt_prefix(Styled::new("›").with_fg(Color::LightCyan))
        .with_highlighted_option_prefix(Styled::new("➤").with_fg(Color::LightBlue));
    inquire::set_global_render_config(config);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MainAction {
    ShowLeads,
    Search,
    FilterStatus,
    ToggleSort,
    OpenLead,
    ShowOpportunities,
    Reload,
    Quit,
}

impl fmt::Display for MainAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ShowLeads => "Show leads",
            Self::Search => "Search by name or company",
            Self::FilterStatus => "Filter by status",
            Self::ToggleSort => "Toggle score sort",
            Self::OpenLead => "Open a lead",
            Self::ShowOpportunities => "Show opportunities",
            Self::Reload => "Reload leads",
            Self::Quit => "Quit",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeadAction {
    Edit,
    Convert,
    Close,
}

impl fmt::Display for LeadAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Edit => "Edit email / status",
            Self::Convert => "Convert to opportunity",
            Self::Close => "Close",
        })
    }
}

/// Select option wrapping a lead row.
struct LeadChoice(Lead);

impl fmt::Display for LeadChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render::lead_row(&self.0))
    }
}

/// Esc / Ctrl-C on a prompt means "back", not an error.
fn cancelled(e: &InquireError) -> bool {
    matches!(
        e,
        InquireError::OperationCanceled | InquireError::OperationInterrupted
    )
}

fn prompt_error(e: InquireError) -> DomainError {
    DomainError::Terminal(e.to_string())
}

fn print_ok(message: &str) {
    println!("{}", message.with(TermColor::Green));
}

fn print_err(message: &str) {
    println!("{}", message.with(TermColor::Red));
}

/// TUI adapter. Inquire prompts.
pub struct TuiInputPort {
    console: Arc<ConsoleService>,
}

impl TuiInputPort {
    pub fn new(console: Arc<ConsoleService>) -> Self {
        Self { console }
    }

    async fn print_leads(&self) {
        if let Some(error) = self.console.error().await {
            print_err(&error);
            return;
        }
        let criteria = self.console.criteria().await;
        println!(
            "Search: \"{}\" | Status: {} | Score: {}",
            criteria.search_term, criteria.status_filter, criteria.sort_direction
        );
        println!("{}", render::leads_table(&self.console.visible_leads().await));
    }

    async fn search(&self) -> Result<(), DomainError> {
        let current = self.console.criteria().await.search_term;
        match Text::new("Search term (empty clears):")
            .with_initial_value(&current)
            .prompt()
        {
            Ok(term) => {
                self.console.set_search_term(term.trim()).await;
                self.print_leads().await;
                Ok(())
            }
            Err(e) if cancelled(&e) => Ok(()),
            Err(e) => Err(prompt_error(e)),
        }
    }

    async fn filter_status(&self) -> Result<(), DomainError> {
        let options = StatusFilter::options();
        let current = self.console.criteria().await.status_filter;
        let start = options.iter().position(|o| *o == current).unwrap_or(0);
        match Select::new("Show leads with status:", options)
            .with_starting_cursor(start)
            .prompt()
        {
            Ok(filter) => {
                self.console.set_status_filter(filter).await;
                self.print_leads().await;
                Ok(())
            }
            Err(e) if cancelled(&e) => Ok(()),
            Err(e) => Err(prompt_error(e)),
        }
    }

    async fn open_lead(&self) -> Result<(), DomainError> {
        let leads = self.console.visible_leads().await;
        if leads.is_empty() {
            println!("No leads match the current filters.");
            return Ok(());
        }
        let choices: Vec<LeadChoice> = leads.into_iter().map(LeadChoice).collect();
        let picked = match Select::new("Open lead:", choices).with_page_size(12).prompt() {
            Ok(choice) => choice.0,
            Err(e) if cancelled(&e) => return Ok(()),
            Err(e) => return Err(prompt_error(e)),
        };
        if let Err(e) = self.console.select_lead(Some(&picked.id)).await {
            print_err(&e.to_string());
            return Ok(());
        }
        self.lead_panel().await
    }

    /// Detail panel for the selected lead. Returns when the panel is closed.
    async fn lead_panel(&self) -> Result<(), DomainError> {
        loop {
            let Some(lead) = self.console.selected_lead().await else {
                return Ok(());
            };
            println!("\n{}\n", render::lead_detail(&lead));
            let action = match Select::new(
                "Lead actions:",
                vec![LeadAction::Edit, LeadAction::Convert, LeadAction::Close],
            )
            .prompt()
            {
                Ok(action) => action,
                Err(e) if cancelled(&e) => LeadAction::Close,
                Err(e) => return Err(prompt_error(e)),
            };
            match action {
                LeadAction::Edit => self.edit_lead(&lead).await?,
                LeadAction::Convert => self.convert_lead(&lead).await?,
                LeadAction::Close => {
                    self.console.select_lead(None).await?;
                    return Ok(());
                }
            }
        }
    }

    async fn edit_lead(&self, lead: &Lead) -> Result<(), DomainError> {
        let email = loop {
            match Text::new("Email:").with_initial_value(&lead.email).prompt() {
                Ok(email) if is_valid_email(email.trim()) => break email.trim().to_string(),
                Ok(_) => print_err(INVALID_EMAIL_MESSAGE),
                Err(e) if cancelled(&e) => return Ok(()),
                Err(e) => return Err(prompt_error(e)),
            }
        };

        let status = if lead.status == LeadStatus::Converted {
            LeadStatus::Converted
        } else {
            let options: Vec<LeadStatus> = LeadStatus::ALL
                .into_iter()
                .filter(|s| *s != LeadStatus::Converted)
                .collect();
            let start = options.iter().position(|s| *s == lead.status).unwrap_or(0);
            match Select::new("Status:", options)
                .with_starting_cursor(start)
                .prompt()
            {
                Ok(status) => status,
                Err(e) if cancelled(&e) => return Ok(()),
                Err(e) => return Err(prompt_error(e)),
            }
        };

        let patch = LeadPatch {
            email: (email != lead.email).then_some(email),
            status: (status != lead.status).then_some(status),
        };
        if patch.is_empty() {
            println!("Nothing changed.");
            return Ok(());
        }

        match with_spinner("Saving…", self.console.update_lead(&lead.id, patch)).await {
            Ok(_) => print_ok("Lead updated."),
            Err(e) => print_err(&e.to_string()),
        }
        Ok(())
    }

    async fn convert_lead(&self, lead: &Lead) -> Result<(), DomainError> {
        if lead.status == LeadStatus::Converted {
            print_err(
                &DomainError::AlreadyConverted {
                    lead_id: lead.id.clone(),
                }
                .to_string(),
            );
            return Ok(());
        }

        let amount = loop {
            match Text::new("Amount (optional):").prompt() {
                Ok(input) => match parse_amount(&input) {
                    Ok(amount) => break amount,
                    Err(e) => print_err(&e.to_string()),
                },
                Err(e) if cancelled(&e) => return Ok(()),
                Err(e) => return Err(prompt_error(e)),
            }
        };
        let stage = match Select::new("Stage:", OpportunityStage::ALL.to_vec()).prompt() {
            Ok(stage) => stage,
            Err(e) if cancelled(&e) => return Ok(()),
            Err(e) => return Err(prompt_error(e)),
        };

        let request = ConversionRequest::for_lead(lead, amount, stage);
        match with_spinner("Converting…", self.console.convert_lead(&lead.id, request)).await {
            Ok(opportunity) => {
                print_ok(&format!(
                    "Lead converted to opportunity {}.",
                    opportunity.id
                ));
                self.console.select_lead(None).await?;
            }
            Err(e) => print_err(&e.to_string()),
        }
        Ok(())
    }
}

#[async_trait]
impl InputPort for TuiInputPort {
    async fn run(&self) -> Result<(), DomainError> {
        if let Err(e) = with_spinner("Loading leads…", self.console.start()).await {
            print_err(&e.to_string());
        }
        self.print_leads().await;

        loop {
            let sort = self.console.criteria().await.sort_direction;
            let opportunities = self.console.opportunities().await.len();
            let mut actions = vec![
                MainAction::ShowLeads,
                MainAction::Search,
                MainAction::FilterStatus,
                MainAction::ToggleSort,
                MainAction::OpenLead,
                MainAction::ShowOpportunities,
            ];
            if self.console.error().await.is_some() {
                actions.push(MainAction::Reload);
            }
            actions.push(MainAction::Quit);

            let prompt = format!("Leads (score {}) | Opportunities: {}", sort, opportunities);
            let action = match Select::new(&prompt, actions).prompt() {
                Ok(action) => action,
                Err(e) if cancelled(&e) => MainAction::Quit,
                Err(e) => return Err(prompt_error(e)),
            };

            match action {
                MainAction::ShowLeads => self.print_leads().await,
                MainAction::Search => self.search().await?,
                MainAction::FilterStatus => self.filter_status().await?,
                MainAction::ToggleSort => {
                    self.console.toggle_sort_direction().await;
                    self.print_leads().await;
                }
                MainAction::OpenLead => self.open_lead().await?,
                MainAction::ShowOpportunities => {
                    println!(
                        "{}",
                        render::opportunities_table(&self.console.opportunities().await)
                    );
                }
                MainAction::Reload => {
                    match with_spinner("Loading leads…", self.console.reload_leads()).await {
                        Ok(count) => print_ok(&format!("Loaded {} leads.", count)),
                        Err(e) => print_err(&e.to_string()),
                    }
                }
                MainAction::Quit => return Ok(()),
            }
        }
    }
}
