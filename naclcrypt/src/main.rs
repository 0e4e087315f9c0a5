// naclcrypt is a personal keyring and authenticated file-encryption tool.
// Copyright (C) 2024  Himbeer <himbeerserverde@gmail.com>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

mod error;
mod hexfmt;
pub use error::*;

use naclcrypt_core::codec;
use naclcrypt_core::crypto::box_keypair;
use naclcrypt_core::keyring::Keyring;

use std::io::{stdin, stdout, BufRead, BufReader, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the keyring database. Falls back to the NACLCRYPT_DB
    /// environment variable if omitted.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a fresh keypair and store it under a name.
    Generate {
        name: String,
        /// Overwrite an existing entry instead of rejecting the name.
        #[arg(short = 'f', long)]
        force: bool,
        /// Store only the public half.
        #[arg(short = 'p')]
        public_only: bool,
        /// Store only the private half.
        #[arg(short = 'P')]
        private_only: bool,
    },
    /// Print the stored half(s) of a name as hex lines.
    Export {
        name: String,
        /// Export only the public half.
        #[arg(short = 'p')]
        public_only: bool,
        /// Export only the private half.
        #[arg(short = 'P')]
        private_only: bool,
    },
    /// Read `p:`/`P:` hex lines from stdin and store them under a name.
    Import {
        name: String,
        /// Overwrite existing halves instead of rejecting the name.
        #[arg(short = 'f', long)]
        force: bool,
        /// Import only public-tagged lines.
        #[arg(short = 'p')]
        public_only: bool,
        /// Import only private-tagged lines.
        #[arg(short = 'P')]
        private_only: bool,
    },
    /// Remove the stored half(s) of a name.
    Delete {
        name: String,
        /// Delete only the public half.
        #[arg(short = 'p')]
        public_only: bool,
        /// Delete only the private half.
        #[arg(short = 'P')]
        private_only: bool,
        /// Succeed even if nothing was stored for the name.
        #[arg(short = 'f', long)]
        force: bool,
    },
    /// List every named entry. With neither `-p` nor `-P`, only names are
    /// printed; with either (or both), each line also carries the hex (or
    /// underscore placeholder) of the requested half(s).
    List {
        /// Show the public half's hex.
        #[arg(short = 'p')]
        public: bool,
        /// Show the private half's hex.
        #[arg(short = 'P')]
        private: bool,
    },
    /// Encrypt stdin to stdout. `-s` is the sender identity (its private
    /// half is used), `-t` is the recipient identity (its public half).
    Encrypt {
        #[arg(short = 's', long)]
        source: String,
        #[arg(short = 't', long)]
        target: String,
    },
    /// Decrypt stdin to stdout. `-s` is the sender identity (its public
    /// half is used), `-t` is the recipient identity (its private half).
    Decrypt {
        #[arg(short = 's', long)]
        source: String,
        #[arg(short = 't', long)]
        target: String,
    },
}

fn db_path(cli_db: Option<PathBuf>) -> Result<PathBuf> {
    cli_db
        .or_else(|| std::env::var_os("NACLCRYPT_DB").map(PathBuf::from))
        .ok_or(Error::NoDbPath)
}

/// Resolves `-p`/`-P` into (want_public, want_private) for the key
/// operations (generate/export/import/delete): if neither is given, `-p`
/// is implied. `list` does not use this — its own default is names-only.
fn resolve_halves(public_only: bool, private_only: bool) -> (bool, bool) {
    if !public_only && !private_only {
        (true, false)
    } else {
        (public_only, private_only)
    }
}

fn logic() -> Result<()> {
    let cli = Cli::parse();
    let path = db_path(cli.db)?;

    match cli.command {
        Commands::Generate {
            name,
            force,
            public_only,
            private_only,
        } => {
            let mut keyring = Keyring::open(&path)?;
            let (public, private) = box_keypair();
            let (want_public, want_private) = resolve_halves(public_only, private_only);

            match (want_public, want_private) {
                (true, true) if force => {
                    keyring.put_pair(&name, &public, &private)?;
                }
                (true, true) => {
                    keyring.set_pair(&name, &public, &private)?;
                }
                (true, false) if force => {
                    keyring.put_public(&name, &public)?;
                }
                (true, false) => {
                    keyring.set_public(&name, &public)?;
                }
                (false, true) if force => {
                    keyring.put_private(&name, &private)?;
                }
                (false, true) => {
                    keyring.set_private(&name, &private)?;
                }
                (false, false) => unreachable!("resolve_halves always wants at least one half"),
            }
            println!("Generated \"{name}\"");
        }
        Commands::Export {
            name,
            public_only,
            private_only,
        } => {
            let keyring = Keyring::open(&path)?;
            let (want_public, want_private) = resolve_halves(public_only, private_only);

            if want_public {
                match keyring.get_public(&name)? {
                    Some(key) => println!("{}", hexfmt::format_public_line(&key)),
                    None => return Err(Error::NotFound(name)),
                }
            }
            if want_private {
                match keyring.get_private(&name)? {
                    Some(key) => println!("{}", hexfmt::format_private_line(&key)),
                    None => return Err(Error::NotFound(name)),
                }
            }
        }
        Commands::Import {
            name,
            force,
            public_only,
            private_only,
        } => {
            let mut keyring = Keyring::open(&path)?;
            let (want_public, want_private) = resolve_halves(public_only, private_only);

            for line in BufReader::new(stdin().lock()).lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match hexfmt::parse_line(&line)? {
                    hexfmt::ParsedLine::Public(key) if want_public => {
                        if force {
                            keyring.put_public(&name, &key)?;
                        } else {
                            keyring.set_public(&name, &key)?;
                        }
                    }
                    hexfmt::ParsedLine::Private(key) if want_private => {
                        if force {
                            keyring.put_private(&name, &key)?;
                        } else {
                            keyring.set_private(&name, &key)?;
                        }
                    }
                    _ => {}
                }
            }
            println!("Imported \"{name}\"");
        }
        Commands::Delete {
            name,
            public_only,
            private_only,
            force,
        } => {
            let mut keyring = Keyring::open(&path)?;
            let (want_public, want_private) = resolve_halves(public_only, private_only);
            match (want_public, want_private) {
                (true, true) => {
                    keyring.delete_pair(&name, force)?;
                }
                (true, false) => {
                    keyring.delete_public(&name, force)?;
                }
                (false, true) => {
                    keyring.delete_private(&name, force)?;
                }
                (false, false) => unreachable!("resolve_halves always wants at least one half"),
            }
            println!("Deleted \"{name}\"");
        }
        Commands::List { public, private } => {
            let keyring = Keyring::open(&path)?;
            let show_halves = public || private;
            let mut out = stdout().lock();
            let mut write_err = None;
            keyring.list(|name, pk, sk| {
                let line = if show_halves {
                    hexfmt::format_list_row(name, pk, sk)
                } else {
                    name.to_string()
                };
                match writeln!(out, "{line}") {
                    Ok(()) => std::ops::ControlFlow::Continue(()),
                    Err(e) => {
                        write_err = Some(e);
                        std::ops::ControlFlow::Break(())
                    }
                }
            })?;
            if let Some(e) = write_err {
                return Err(Error::Io(e));
            }
        }
        Commands::Encrypt { source, target } => {
            let keyring = Keyring::open(&path)?;
            let sender_sk = keyring
                .get_private(&source)?
                .ok_or_else(|| Error::NotFound(source.clone()))?;
            let recipient_pk = keyring
                .get_public(&target)?
                .ok_or_else(|| Error::NotFound(target.clone()))?;

            let stdin = stdin();
            let stdout = stdout();
            codec::encrypt_stream(
                stdin.lock(),
                stdout.lock(),
                &sender_sk,
                &recipient_pk,
            )?;
        }
        Commands::Decrypt { source, target } => {
            let keyring = Keyring::open(&path)?;
            let sender_pk = keyring
                .get_public(&source)?
                .ok_or_else(|| Error::NotFound(source.clone()))?;
            let recipient_sk = keyring
                .get_private(&target)?
                .ok_or_else(|| Error::NotFound(target.clone()))?;

            let stdin = stdin();
            let stdout = stdout();
            codec::decrypt_stream(
                stdin.lock(),
                stdout.lock(),
                &recipient_sk,
                &sender_pk,
            )?;
        }
    }

    Ok(())
}

fn main() {
    match logic() {
        Ok(()) => {}
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
