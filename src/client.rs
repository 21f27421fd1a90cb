use crate::ui;
use color_eyre::eyre::Result;
use gama_dice::{
    BetController,
    BetPolicy,
    BetRequest,
    chain::Address,
    config::{
        Network,
        NetworkConfig,
    },
    funds::FundsSnapshot,
    history::AccountStats,
    lifecycle::BetPhase,
    notify::{
        Notice,
        NoticeSink,
    },
    sim::SimChain,
    submit::{
        MAX_NUMBER,
        MIN_NUMBER,
    },
};
use std::{
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::mpsc,
    time,
};
use tracing::info;

const DEMO_CHIPS: u64 = 10_000;
const DEMO_NATIVE: u64 = 10_000_000;
const NOTICE_DEPTH: usize = 6;
const HISTORY_EXPORT_PATH: &str = "gama-dice-history.json";

#[derive(Clone, Debug)]
pub struct HistoryRow {
    pub chosen: u8,
    pub rolled: Option<u8>,
    pub amount: u64,
    pub payout: u64,
    pub won: bool,
}

/// Everything the rendering layer needs for one frame.
#[derive(Clone, Debug)]
pub struct AppSnapshot {
    pub network: &'static str,
    pub chain_id: u64,
    pub dice_contract: Address,
    pub account: Option<Address>,
    pub funds: FundsSnapshot,
    pub phase: BetPhase,
    pub selected_number: u8,
    pub amount: u64,
    pub last_result: Option<(u8, u64)>,
    pub stats: AccountStats,
    pub history: Vec<HistoryRow>,
    pub notices: Vec<Notice>,
    pub status: String,
}

pub struct App {
    controller: BetController,
    config: NetworkConfig,
    selected_number: u8,
    amount: u64,
    notices: Vec<Notice>,
    status: String,
}

impl App {
    pub fn snapshot(&self) -> AppSnapshot {
        let lifecycle = self.controller.lifecycle();
        AppSnapshot {
            network: self.config.network.label(),
            chain_id: self.config.chain_id,
            dice_contract: self.config.dice_contract,
            account: self.controller.account(),
            funds: self.controller.funds(),
            phase: self.controller.phase(),
            selected_number: self.selected_number,
            amount: self.amount,
            last_result: lifecycle
                .and_then(|l| l.result)
                .map(|r| (r.rolled, r.payout)),
            stats: self.controller.history().stats(),
            history: self
                .controller
                .history()
                .entries()
                .iter()
                .take(12)
                .map(|e| HistoryRow {
                    chosen: e.chosen,
                    rolled: e.rolled,
                    amount: e.amount,
                    payout: e.payout,
                    won: e.won,
                })
                .collect(),
            notices: self.notices.iter().rev().take(NOTICE_DEPTH).cloned().collect(),
            status: self.status.clone(),
        }
    }

    pub fn select_next_number(&mut self) {
        self.selected_number = if self.selected_number >= MAX_NUMBER {
            MIN_NUMBER
        } else {
            self.selected_number + 1
        };
    }

    pub fn select_prev_number(&mut self) {
        self.selected_number = if self.selected_number <= MIN_NUMBER {
            MAX_NUMBER
        } else {
            self.selected_number - 1
        };
    }

    pub fn set_amount(&mut self, amount: u64) {
        self.amount = amount;
    }

    pub async fn place_bet(&mut self) {
        let request = BetRequest {
            number: self.selected_number,
            amount: self.amount,
        };
        let phase = self.controller.place_bet(request).await;
        self.status = format!(
            "Bet {} on {} -> {}",
            request.amount,
            request.number,
            phase.label()
        );
    }

    pub async fn refresh(&mut self) {
        self.controller.refresh_funds().await;
        self.controller.refresh_history().await;
    }

    pub fn export_history(&mut self) {
        match self.controller.history().export_json() {
            Ok(json) => match std::fs::write(HISTORY_EXPORT_PATH, json) {
                Ok(()) => self.status = format!("History written to {HISTORY_EXPORT_PATH}"),
                Err(e) => self.status = format!("History export failed: {e}"),
            },
            Err(e) => self.status = format!("History export failed: {e}"),
        }
    }

    pub fn push_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
        if self.notices.len() > 50 {
            let drain = self.notices.len() - 50;
            self.notices.drain(0..drain);
        }
    }
}

pub async fn run_app(network: Network) -> Result<()> {
    let cfg = network.config();
    info!(
        network = network.label(),
        chain_id = cfg.chain_id,
        dice_contract = %cfg.dice_contract,
        "starting demo session"
    );

    let chain = Arc::new(SimChain::new(cfg));
    let player = Address([0x11; 20]);
    chain.fund(player, DEMO_CHIPS, DEMO_NATIVE);
    chain.set_fulfillment_delay(2);

    let (sink, notice_rx) = NoticeSink::channel();
    let mut controller = BetController::new(chain, BetPolicy::default(), sink);
    controller.set_account(Some(player)).await;

    let mut app = App {
        controller,
        config: cfg,
        selected_number: MIN_NUMBER,
        amount: 100,
        notices: Vec::new(),
        status: String::from("Ready"),
    };

    let mut ui_state = ui::UiState::default();
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(&mut app, &mut ui_state, notice_rx).await;
    ui::terminal_exit()?;
    res
}

async fn run_loop(
    app: &mut App,
    ui_state: &mut ui::UiState,
    mut notice_rx: mpsc::UnboundedReceiver<Notice>,
) -> Result<()> {
    let mut ticker = time::interval(Duration::from_secs(1));
    ui::draw(ui_state, &app.snapshot())?;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => { break; }
            _ = ticker.tick() => {
                app.refresh().await;
                ui::draw(ui_state, &app.snapshot())?;
            }
            notice = notice_rx.recv() => {
                if let Some(notice) = notice {
                    app.push_notice(notice);
                    ui::draw(ui_state, &app.snapshot())?;
                }
            }
            ev = ui::next_event(ui_state) => {
                match ev? {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::NextNumber => app.select_next_number(),
                    ui::UserEvent::PrevNumber => app.select_prev_number(),
                    ui::UserEvent::PlaceBetAmount(amount) => {
                        app.set_amount(amount);
                        app.place_bet().await;
                    }
                    ui::UserEvent::ExportHistory => app.export_history(),
                    ui::UserEvent::Redraw => {
                        ui::draw(ui_state, &app.snapshot())?;
                        continue;
                    }
                }
                ui::draw(ui_state, &app.snapshot())?;
            }
        }
    }
    Ok(())
}
