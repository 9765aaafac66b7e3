//! Fixed-width table output.

use std::io::{self, Write};

use once_cell::sync::Lazy;
use regex::Regex;
use shelfrank_core::{GameRecord, HotGame, PlayTally, Ranking};

static TITLE_NOISE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[\p{Cc}"'`\x{2018}\x{2019}\x{201C}\x{201D}]"#).expect("invalid title regex")
});

/// Title as shown to the user: trimmed, without quotes or control characters.
pub fn clean_title(title: &str) -> String {
    TITLE_NOISE.replace_all(title, "").trim().to_string()
}

fn date_or_dash(date: Option<chrono::NaiveDate>) -> String {
    date.map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn write_ratings(
    out: &mut impl Write,
    ranking: &Ranking<GameRecord>,
    detailed: bool,
) -> io::Result<()> {
    if detailed {
        if let Some(mean) = ranking.mean_rating {
            writeln!(out, "Mean rating: {mean:.2}")?;
        }
        writeln!(
            out,
            "{:<6}{:<8}{:<11}{:<7}{:<13}{}",
            "Rank", "Rating", "Score", "Plays", "Last Played", "Game"
        )?;
    } else {
        writeln!(out, "{:<5}{}", "Rank", "Game")?;
    }

    for (position, game) in ranking.entries.iter().enumerate() {
        let rank = position + 1;
        let title = clean_title(&game.title);
        if detailed {
            writeln!(
                out,
                "{:<6}{:<8.1}{:<11.4}{:<7}{:<13}{}",
                rank,
                game.user_rating,
                game.score,
                game.play_count,
                date_or_dash(game.last_played),
                title
            )?;
        } else {
            writeln!(out, "{rank:<5}{title}")?;
        }
    }
    Ok(())
}

pub fn write_played(
    out: &mut impl Write,
    ranking: &Ranking<PlayTally>,
    detailed: bool,
) -> io::Result<()> {
    if detailed {
        writeln!(
            out,
            "{:<6}{:<7}{:<13}{}",
            "Rank", "Plays", "Last Played", "Game"
        )?;
    } else {
        writeln!(out, "{:<5}{}", "Rank", "Game")?;
    }

    for (position, tally) in ranking.entries.iter().enumerate() {
        let rank = position + 1;
        let title = clean_title(&tally.title);
        if detailed {
            writeln!(
                out,
                "{:<6}{:<7}{:<13}{}",
                rank,
                tally.plays,
                date_or_dash(tally.last_played),
                title
            )?;
        } else {
            writeln!(out, "{rank:<5}{title}")?;
        }
    }
    Ok(())
}

pub fn write_hot(out: &mut impl Write, ranking: &Ranking<HotGame>, detailed: bool) -> io::Result<()> {
    if detailed {
        writeln!(out, "{:<6}{:<6}{}", "Rank", "Year", "Game")?;
    } else {
        writeln!(out, "{:<5}{}", "Rank", "Game")?;
    }

    for game in &ranking.entries {
        let title = clean_title(&game.title);
        if detailed {
            let year = game
                .year_published
                .map(|year| year.to_string())
                .unwrap_or_else(|| "-".to_string());
            writeln!(out, "{:<6}{:<6}{}", game.rank, year, title)?;
        } else {
            writeln!(out, "{:<5}{}", game.rank, title)?;
        }
    }
    Ok(())
}
