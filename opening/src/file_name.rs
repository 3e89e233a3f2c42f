use std::path::Path;
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{char, digit1};
use nom::combinator::{eof, map_res, opt, recognize, rest};
use nom::error::convert_error;
use nom::sequence::{delimited, pair, preceded};
use nom::{Finish, IResult, Parser};

use crate::error::FileNameError;

pub(crate) type ParserError<'a> = nom::error::VerboseError<&'a str>;
pub(crate) type ParserResult<'a, Out> = IResult<&'a str, Out, ParserError<'a>>;

/// Replays from the ranked 1v1 ladder don't put the ladder in their name
pub const DEFAULT_LADDER_ID: i64 = 3;

/// What a downloaded replay's name says about it:
/// `{match_id}_{profile_1}_vs_{profile_2}-{average_elo}({ladder_id})` plus any extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayFileName {
    pub match_id: i64,
    pub profile_ids: Vec<i64>,
    pub average_elo: i64,
    pub ladder_id: i64,
}

impl ReplayFileName {
    pub fn parse(name: &str) -> Result<Self, FileNameError> {
        let (_, parsed) = parse_replay_file_name(name)
            .finish()
            .map_err(|e| FileNameError::Unrecognized {
                name: name.to_string(),
                err: convert_error(name, e),
            })?;
        Ok(parsed)
    }

    pub fn from_path(path: &Path) -> Result<Self, FileNameError> {
        let name = path.file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| FileNameError::NoFileName { name: path.display().to_string() })?;
        Self::parse(name)
    }

    /// The name a replay for this match is saved under
    pub fn to_file_name(&self) -> String {
        let mut profiles = self.profile_ids.iter().map(i64::to_string);
        let first = profiles.next().unwrap_or_default();
        let second = profiles.next().unwrap_or_default();
        format!("{}_{}_vs_{}-{}({}).aoe2record", self.match_id, first, second, self.average_elo, self.ladder_id)
    }
}

fn parse_id(input: &str) -> ParserResult<i64> {
    map_res(digit1, str::parse).parse(input)
}

/// Older replays carry a fractional average, which is rounded
fn parse_elo(input: &str) -> ParserResult<i64> {
    map_res(
        recognize(pair(digit1, opt(pair(char('.'), digit1)))),
        |elo: &str| elo.parse::<f64>().map(|elo| elo.round() as i64),
    ).parse(input)
}

fn parse_replay_file_name(input: &str) -> ParserResult<ReplayFileName> {
    let (input, match_id) = parse_id(input)?;
    let (input, _) = char('_').parse(input)?;
    let (input, first) = parse_id(input)?;
    let (input, _) = tag("_vs_").parse(input)?;
    let (input, second) = parse_id(input)?;
    let (input, _) = char('-').parse(input)?;
    let (input, average_elo) = parse_elo(input)?;
    let (input, ladder_id) = opt(delimited(char('('), parse_id, char(')'))).parse(input)?;
    // Extensions, if any, are whatever's left
    let (input, _) = alt((eof, preceded(char('.'), rest))).parse(input)?;

    Ok((input, ReplayFileName {
        match_id,
        profile_ids: vec![first, second],
        average_elo,
        ladder_id: ladder_id.unwrap_or(DEFAULT_LADDER_ID),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_ranked_replay_name() {
        let parsed = ReplayFileName::parse("271538498_1228227_vs_199325-1843(3).aoe2record").unwrap();
        assert_eq!(parsed, ReplayFileName {
            match_id: 271538498,
            profile_ids: vec![1228227, 199325],
            average_elo: 1843,
            ladder_id: 3,
        });
    }

    #[test]
    fn ladder_defaults_when_missing() {
        let parsed = ReplayFileName::parse("5_1_vs_2-1200.json.gz").unwrap();
        assert_eq!(parsed.ladder_id, DEFAULT_LADDER_ID);
        assert_eq!(parsed.average_elo, 1200);
    }

    #[test]
    fn fractional_elo_is_rounded_and_keeps_its_ladder() {
        let parsed = ReplayFileName::parse("5_1_vs_2-1843.7(13).aoe2record").unwrap();
        assert_eq!(parsed, ReplayFileName {
            match_id: 5,
            profile_ids: vec![1, 2],
            average_elo: 1844,
            ladder_id: 13,
        });

        let rounded_down = ReplayFileName::parse("5_1_vs_2-1843.25.json").unwrap();
        assert_eq!((rounded_down.average_elo, rounded_down.ladder_id), (1843, DEFAULT_LADDER_ID));
    }

    #[test]
    fn parses_decoded_replay_paths() {
        let parsed = ReplayFileName::from_path(Path::new("replays/decoded/9_10_vs_11-999(13).json")).unwrap();
        assert_eq!(parsed.match_id, 9);
        assert_eq!(parsed.ladder_id, 13);
    }

    #[test]
    fn rejects_other_names() {
        assert!(ReplayFileName::parse("MP Replay v101.102 @2023.11.01 120000 (2).aoe2record").is_err());
        assert!(ReplayFileName::parse("5_1_vs_2").is_err());
        assert!(ReplayFileName::parse("5_1_vs_2-1200(3)junk").is_err());
    }

    #[test]
    fn renders_the_download_name() {
        let name = ReplayFileName { match_id: 5, profile_ids: vec![1, 2], average_elo: 1200, ladder_id: 13 };
        assert_eq!(name.to_file_name(), "5_1_vs_2-1200(13).aoe2record");
        assert_eq!(ReplayFileName::parse(&name.to_file_name()).unwrap(), name);
    }
}
