use lazy_static::lazy_static;
use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Help,
    /// `connect` toggles the wallet overlay; `connect <n>` picks account n.
    Connect(Option<usize>),
    Disconnect,
    Amount(String),
    OptIn,
    Donate,
    Polls,
    Select { poll_id: u32, option: usize },
    Vote(u32),
    Balance,
    Status,
    Quit,
}

lazy_static! {
    static ref CONNECT_RE: Regex = Regex::new(r"^connect(?:\s+([0-9]+))?$").unwrap();
    static ref AMOUNT_RE: Regex = Regex::new(r"^amount(?:\s+(\S+))?$").unwrap();
    static ref SELECT_RE: Regex = Regex::new(r"^select\s+([0-9]+)\s+([0-9]+)$").unwrap();
    static ref VOTE_RE: Regex = Regex::new(r"^vote\s+([0-9]+)$").unwrap();
}

pub const HELP: &str = "\
Commands:
  connect            open or close the wallet-selection overlay
  connect <n>        connect wallet account n
  disconnect         disconnect the wallet
  amount <ALGO>      set the donation amount (empty clears it)
  optin              opt in to the ANJ token
  donate             donate the entered amount
  polls              show community proposals
  select <poll> <n>  choose option n in a poll
  vote <poll>        cast your vote (spends ANJ)
  balance            show your ANJ balance
  status             show account and ledger details
  quit               end the session";

/// Parses one console line. Blank lines yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let command = match line {
        "help" | "?" => ConsoleCommand::Help,
        "disconnect" => ConsoleCommand::Disconnect,
        "optin" | "opt-in" => ConsoleCommand::OptIn,
        "donate" => ConsoleCommand::Donate,
        "polls" => ConsoleCommand::Polls,
        "balance" => ConsoleCommand::Balance,
        "status" => ConsoleCommand::Status,
        "quit" | "exit" => ConsoleCommand::Quit,
        _ => {
            if let Some(caps) = CONNECT_RE.captures(line) {
                ConsoleCommand::Connect(caps.get(1).and_then(|m| m.as_str().parse().ok()))
            } else if let Some(caps) = AMOUNT_RE.captures(line) {
                ConsoleCommand::Amount(
                    caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default(),
                )
            } else if let Some(caps) = SELECT_RE.captures(line) {
                match (caps[1].parse(), caps[2].parse()) {
                    (Ok(poll_id), Ok(option)) => ConsoleCommand::Select { poll_id, option },
                    _ => return Err(format!("Numbers out of range: {}", line)),
                }
            } else if let Some(caps) = VOTE_RE.captures(line) {
                match caps[1].parse() {
                    Ok(poll_id) => ConsoleCommand::Vote(poll_id),
                    Err(_) => return Err(format!("Numbers out of range: {}", line)),
                }
            } else {
                return Err(format!("Unknown command: {} (try `help`)", line));
            }
        }
    };
    Ok(Some(command))
}
