//! Interactive commands read from standard input.

use std::str::FromStr;

/// A single line of user input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Play,
    Pause,
    Stop,
    Toggle,
    Volume(f32),
    Mute,
    Reconnect,
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "commands: play | pause | stop | toggle | vol <0..1> | mute | reconnect | status | help | quit";

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err("empty command".to_string());
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "play" | "p" => Command::Play,
            "pause" => Command::Pause,
            "stop" | "s" => Command::Stop,
            "toggle" | "t" => Command::Toggle,
            "mute" | "m" => Command::Mute,
            "reconnect" => Command::Reconnect,
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            "vol" | "volume" | "v" => {
                let level = words
                    .next()
                    .ok_or_else(|| "vol needs a level between 0 and 1".to_string())?;
                let level = level
                    .parse::<f32>()
                    .map_err(|_| format!("invalid volume level: {}", level))?;
                Command::Volume(level)
            }
            other => return Err(format!("unknown command: {}", other)),
        };

        if words.next().is_some() {
            return Err(format!("too many arguments for {}", verb));
        }
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_transport_commands() {
        assert_eq!("play".parse::<Command>(), Ok(Command::Play));
        assert_eq!("  PAUSE ".parse::<Command>(), Ok(Command::Pause));
        assert_eq!("t".parse::<Command>(), Ok(Command::Toggle));
        assert_eq!("quit".parse::<Command>(), Ok(Command::Quit));
    }

    #[test]
    fn parses_volume_level() {
        assert_eq!("vol 0.6".parse::<Command>(), Ok(Command::Volume(0.6)));
        // Out-of-range levels are clamped by the session, not rejected here
        assert_eq!("volume 3".parse::<Command>(), Ok(Command::Volume(3.0)));
    }

    #[test]
    fn rejects_bad_input() {
        assert!("".parse::<Command>().is_err());
        assert!("vol".parse::<Command>().is_err());
        assert!("vol loud".parse::<Command>().is_err());
        assert!("play now".parse::<Command>().is_err());
        assert!("rewind".parse::<Command>().is_err());
    }
}
