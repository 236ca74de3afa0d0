// Interactive terminal session: the same analyse/confirm/log loop as the web page,
// with one Session for the lifetime of the process.

use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use tracing::{error, info};

use crate::chart::{format_amount, BarChart};
use crate::gemini::GeminiClient;
use crate::ledger::Ledger;
use crate::nutrient::{Nutrient, TargetTable};
use crate::session::{Session, SessionError};

/// Runs the interactive loop until an empty dish name or end of input.
/// Returns the session so callers can inspect what was logged.
pub async fn run_chat_session<R: BufRead, W: Write>(
    client: &GeminiClient,
    api_key: Option<String>,
    mut input: R,
    mut output: W,
) -> Result<Session> {
    info!("Starting chat session...");
    let mut session = Session::new(api_key);

    while !session.has_credential() {
        match prompt(&mut input, &mut output, "Gemini APIキー: ")? {
            Some(key) => {
                if !session.set_credential(key) {
                    writeln!(output, "APIキーを入力してください。")?;
                }
            }
            None => {
                writeln!(output, "APIキーを入力してください。")?;
                return Ok(session);
            }
        }
    }

    loop {
        let dish = match prompt(&mut input, &mut output, "料理名を入力: ")? {
            Some(dish) if !dish.trim().is_empty() => dish,
            _ => break,
        };

        writeln!(output, "AIが解析中...")?;
        let can_add = match session.analyze(client, &dish).await {
            Ok(analysis) => {
                writeln!(output, "\nAI解析結果\n{}\n", analysis.raw_text.trim_end())?;
                if analysis.can_be_added() {
                    writeln!(output, "解析データ")?;
                    for (nutrient, amount) in analysis.reading.iter() {
                        writeln!(output, "  {}: {} {}", nutrient, format_amount(amount), nutrient.unit())?;
                    }
                }
                analysis.can_be_added()
            }
            Err(SessionError::AnalysisUnavailable(e)) => {
                error!("Analysis failed: {}", e);
                writeln!(output, "AIによる解析に失敗しました: {}", e)?;
                continue;
            }
            Err(e) => {
                writeln!(output, "{}", e)?;
                continue;
            }
        };

        if can_add {
            let answer = prompt(&mut input, &mut output, "食事履歴に追加しますか？ [y/N]: ")?;
            if matches!(answer.as_deref().map(str::trim), Some("y" | "Y" | "yes")) {
                session.confirm_pending().context("Failed to add meal to history")?;
                writeln!(output, "食事履歴に追加しました！")?;
            }
        }

        write_report(&mut output, session.ledger())?;
    }

    info!(entries = session.ledger().len(), "Chat session finished");
    Ok(session)
}

fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, label: &str) -> Result<Option<String>> {
    write!(output, "{}", label)?;
    output.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// History table plus both charts.
pub fn write_report<W: Write>(output: &mut W, ledger: &Ledger) -> Result<()> {
    writeln!(output)?;
    if ledger.is_empty() {
        writeln!(output, "食事履歴がありません。")?;
        return Ok(());
    }

    writeln!(output, "食事履歴")?;
    for entry in ledger.entries() {
        let cells: Vec<String> = Nutrient::ALL
            .iter()
            .map(|&n| match entry.reading().get(n) {
                Some(v) => format!("{} {}{}", n, format_amount(v), n.unit()),
                None => format!("{} -", n),
            })
            .collect();
        writeln!(output, "  {} | {}", entry.dish(), cells.join(" | "))?;
    }
    writeln!(output)?;

    let target = TargetTable::daily();
    writeln!(output, "{}", BarChart::totals(&ledger.totals()).render_text())?;
    writeln!(output, "{}", BarChart::against_target(&ledger.compare_to_target(&target)).render_text())?;
    Ok(())
}
