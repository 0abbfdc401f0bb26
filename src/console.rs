//! Line-oriented command dispatcher
//!
//! Each line is `<user> [#chat] /command [args...]`. Without `#chat` the
//! user's own id doubles as the chat id, like a private chat. Replies are
//! plain text; refusals come back as `CommandError` with the same
//! `ErrorKind` classification the engines use.

use crate::checkers::{CheckersError, Opponent};
use crate::errors::ErrorKind;
use crate::factory::Arcade;
use crate::games::{BetError, GameMode, MoveInput, Variant};
use crate::wallet::{Credits, LedgerError, UserId};
use std::fmt::Write;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Bet(#[from] BetError),

    #[error(transparent)]
    Checkers(#[from] CheckersError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl CommandError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommandError::Usage(_) => ErrorKind::Validation,
            CommandError::Bet(e) => e.kind(),
            CommandError::Checkers(e) => e.kind(),
            CommandError::Ledger(e) => e.kind(),
        }
    }
}

fn usage(text: &str) -> CommandError {
    CommandError::Usage(format!("Usage: {}", text))
}

pub const HELP: &str = "\
Commands (prefix each line with your user id, optionally followed by #chat):
  /wallet                        show balance and open games
  /resetwallet                   reset balance to the starting amount
  /bet <dice|coin|number|rps> <amount> [solo]
  /dice|/coin|/number|/rps [amount]   quick solo game
  /join <game>                   join a multiplayer bet
  /play <game> <move>            roll | heads | tails | 1-10 | rock | paper | scissors
  /cancel <game>                 cancel your bet
  /game <game>                   show a bet
  /checkers [ai|human]           start checkers (against the AI by default)
  /joincheckers                  take the dark pieces
  /move A3-B4                    move a piece
  /board                         show the board
  /endcheckers                   end the checkers game in this chat
  /setbalance|/addcredits|/removecredits <user> <amount>   admin only
  /wallets                       admin only";

/// Routes text commands to the ledger and engines
pub struct Dispatcher {
    arcade: Arcade,
}

impl Dispatcher {
    pub fn new(arcade: Arcade) -> Self {
        Self { arcade }
    }

    pub fn arcade(&self) -> &Arcade {
        &self.arcade
    }

    /// Handle one input line; blank lines and `#` comments yield `None`
    pub fn handle_line(&self, line: &str) -> Option<Result<String, CommandError>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        Some(self.dispatch(line))
    }

    fn dispatch(&self, line: &str) -> Result<String, CommandError> {
        let mut tokens = line.split_whitespace().peekable();
        let user: UserId = tokens
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| usage("<user id> [#chat] /command [args]"))?;

        let chat = match tokens.peek() {
            Some(token) if token.starts_with('#') => {
                let chat = token[1..]
                    .parse()
                    .map_err(|_| usage("<user id> #<chat id> /command"))?;
                tokens.next();
                chat
            }
            _ => user,
        };

        let command = tokens.next().ok_or_else(|| usage("<user id> /command"))?;
        let args: Vec<&str> = tokens.collect();
        self.run(user, chat, command, &args)
    }

    fn run(&self, user: UserId, chat: i64, command: &str, args: &[&str]) -> Result<String, CommandError> {
        let ledger = &self.arcade.ledger;
        let betting = &self.arcade.betting;
        let checkers = &self.arcade.checkers;

        match command.to_ascii_lowercase().as_str() {
            "/help" | "/start" => Ok(HELP.to_string()),
            "/wallet" | "/balance" => Ok(self.wallet_text(user)),
            "/resetwallet" => {
                let balance = ledger.reset(user)?;
                Ok(format!("Wallet reset to {} credits", balance))
            }
            "/bet" => {
                let (variant, stake) = match args {
                    [variant, amount, ..] => (variant.parse::<Variant>()?, parse_amount(amount)?),
                    _ => return Err(usage("/bet <dice|coin|number|rps> <amount> [solo]")),
                };
                let solo = args
                    .get(2)
                    .map(|flag| matches!(flag.to_ascii_lowercase().as_str(), "solo" | "single" | "sp" | "s"))
                    .unwrap_or(false);
                let mode = if solo { GameMode::Solo } else { GameMode::Multiplayer };
                Ok(betting.create(variant, user, stake, mode)?.status_text())
            }
            "/dice" | "/coin" | "/number" | "/rps" => {
                let variant: Variant = command[1..].parse()?;
                let stake = match args.first() {
                    Some(amount) => parse_amount(amount)?,
                    None => self.arcade.config.betting.quick_stake,
                };
                Ok(betting.create(variant, user, stake, GameMode::Solo)?.status_text())
            }
            "/join" => {
                let id = single_arg(args, "/join <game>")?;
                Ok(betting.join(&id.to_ascii_uppercase(), user)?.status_text())
            }
            "/play" => {
                let (id, input) = match args {
                    [id, mv] => (id.to_ascii_uppercase(), mv.parse::<MoveInput>()?),
                    _ => return Err(usage("/play <game> <move>")),
                };
                Ok(betting.submit_move(&id, user, input)?.status_text())
            }
            "/cancel" => {
                let id = single_arg(args, "/cancel <game>")?;
                Ok(betting.cancel(&id.to_ascii_uppercase(), user)?.status_text())
            }
            "/game" => {
                let id = single_arg(args, "/game <game>")?;
                Ok(betting.get(&id.to_ascii_uppercase())?.status_text())
            }
            "/checkers" => {
                let opponent = match args {
                    [] => Opponent::Ai,
                    [choice] if choice.eq_ignore_ascii_case("ai") => Opponent::Ai,
                    [choice] if choice.eq_ignore_ascii_case("human") => Opponent::Human,
                    _ => return Err(usage("/checkers [ai|human]")),
                };
                Ok(checkers.start(chat, user, opponent)?.status_text())
            }
            "/joincheckers" => Ok(checkers.join(chat, user)?.status_text()),
            "/move" => {
                if args.is_empty() {
                    return Err(usage("/move A3-B4"));
                }
                let report = checkers.play(chat, user, &args.join(" "))?;
                let mut text = String::new();
                if !report.ai_moves.is_empty() {
                    let moves: Vec<String> = report.ai_moves.iter().map(|mv| mv.to_string()).collect();
                    let _ = writeln!(text, "AI played {}", moves.join(", "));
                }
                text.push_str(&report.view.status_text());
                Ok(text)
            }
            "/board" => Ok(checkers.view(chat)?.status_text()),
            "/endcheckers" => {
                checkers.end(chat)?;
                Ok("The checkers game has been ended.".to_string())
            }
            "/setbalance" => {
                let (target, amount) = target_and_amount(args, "/setbalance <user> <amount>")?;
                let balance = ledger.admin_set_balance(user, target, amount)?;
                Ok(format!("User {} now has {} credits", target, balance))
            }
            "/addcredits" => {
                let (target, amount) = target_and_amount(args, "/addcredits <user> <amount>")?;
                let balance = ledger.admin_add_balance(user, target, amount)?;
                Ok(format!("User {} now has {} credits", target, balance))
            }
            "/removecredits" => {
                let (target, amount) = target_and_amount(args, "/removecredits <user> <amount>")?;
                let balance = ledger.admin_remove_balance(user, target, amount)?;
                Ok(format!("User {} now has {} credits", target, balance))
            }
            "/wallets" => {
                let wallets = ledger.admin_list_wallets(user)?;
                let mut text = format!("{} wallets\n", wallets.len());
                for (id, balance) in wallets {
                    let _ = writeln!(text, "{}: {}", id, balance);
                }
                Ok(text)
            }
            other => Err(CommandError::Usage(format!("Unknown command {} (try /help)", other))),
        }
    }

    fn wallet_text(&self, user: UserId) -> String {
        let mut text = format!("Balance: {} credits\n", self.arcade.ledger.balance(user));
        let games = self.arcade.betting.games_for(user);
        if !games.is_empty() {
            let _ = writeln!(text, "Open bets:");
            for game in games {
                let _ = writeln!(text, "  {} {} ({} credits, {})", game.id, game.variant, game.stake, game.state);
            }
        }
        for (chat, view) in self.arcade.checkers.games_for(user) {
            let _ = writeln!(text, "Checkers in chat {}: {}", chat, view);
        }
        text
    }
}

fn parse_amount(text: &str) -> Result<Credits, CommandError> {
    text.parse::<Credits>()
        .ok()
        .filter(|amount| *amount > 0)
        .ok_or_else(|| CommandError::Usage(format!("'{}' is not a positive amount", text)))
}

fn single_arg<'a>(args: &[&'a str], text: &str) -> Result<&'a str, CommandError> {
    match args {
        [arg] => Ok(*arg),
        _ => Err(usage(text)),
    }
}

fn target_and_amount(args: &[&str], text: &str) -> Result<(UserId, Credits), CommandError> {
    match args {
        [target, amount] => {
            let target = target.parse().map_err(|_| usage(text))?;
            let amount = amount.parse().map_err(|_| usage(text))?;
            Ok((target, amount))
        }
        _ => Err(usage(text)),
    }
}
