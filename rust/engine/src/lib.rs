//! # blackjack-engine: Blackjack Round Engine Core
//!
//! Server-authoritative blackjack for one player against the dealer. Owns
//! the bank, the deck and the round state machine so that a client only ever
//! renders snapshots it is given.
//!
//! ## Core Modules
//!
//! - [`cards`] - Card representation (Suit, Rank, Card) and deck construction
//! - [`deck`] - Per-round shuffling with a seedable ChaCha20 RNG
//! - [`hand`] - Hand valuation with soft-ace reduction
//! - [`rules`] - Dealer policy, settlement and payouts
//! - [`engine`] - The round state machine (bet, deal, hit, stand, double, surrender, split)
//! - [`game`] - Phases, transition names and player-safe views
//! - [`player`] - Player actions and wagered hands
//! - [`logger`] - Round records and the append-only session history
//! - [`ledger`] - Pending and settled cash-outs
//! - [`errors`] - Error types for game operations
//!
//! ## Quick Start
//!
//! ```rust
//! use blackjack_engine::cards::{Card, Rank, Suit};
//! use blackjack_engine::hand::{hand_value, is_blackjack};
//!
//! let hand = [
//!     Card::new(Rank::Ace, Suit::Hearts),
//!     Card::new(Rank::King, Suit::Spades),
//! ];
//! assert_eq!(hand_value(&hand), 21);
//! assert!(is_blackjack(&hand));
//! ```
//!
//! ## Playing a Round
//!
//! ```rust
//! use blackjack_engine::engine::Engine;
//! use blackjack_engine::game::Phase;
//!
//! let mut engine = Engine::new(1000, Some(42));
//! engine.place_bet(100)?;
//! engine.deal()?;
//! if engine.phase() == Phase::PlayerTurn {
//!     engine.stand()?;
//! }
//! assert_eq!(engine.phase(), Phase::Resolved);
//! assert_eq!(engine.history().len(), 1);
//! # Ok::<(), blackjack_engine::errors::GameError>(())
//! ```

pub mod cards;
pub mod deck;
pub mod engine;
pub mod errors;
pub mod game;
pub mod hand;
pub mod ledger;
pub mod logger;
pub mod player;
pub mod rules;
