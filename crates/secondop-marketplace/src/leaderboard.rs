//! Doctor leaderboard
//!
//! Approved doctors ranked by rank score (`cases_closed * 10 + bonus_points`).
//! Equal scores are ordered by earlier registration, then by user id, so the
//! ranking is the same on every backend and every run.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use secondop_types::{Specialty, User, UserId};

/// One ranked doctor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based
    pub rank: usize,
    pub user_id: UserId,
    pub name: String,
    pub specialty: Specialty,
    pub avatar_url: Option<String>,
    pub rank_score: u64,
    pub cases_closed: u32,
    pub bonus_points: u32,
    pub rating: Decimal,
}

/// A doctor's own position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub entry: LeaderboardEntry,
    /// Points needed to pass the doctor one rank above; `None` at rank 1
    pub points_to_next: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    entries: Vec<LeaderboardEntry>,
}

fn compare(a: &User, b: &User) -> Ordering {
    b.rank_score()
        .cmp(&a.rank_score())
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

impl Leaderboard {
    /// Rank the approved doctors among `users`
    pub fn rank(users: &[User]) -> Self {
        let mut doctors: Vec<&User> = users
            .iter()
            .filter(|u| u.is_doctor() && u.is_approved)
            .collect();
        doctors.sort_by(|a, b| compare(a, b));

        let entries = doctors
            .into_iter()
            .enumerate()
            .filter_map(|(i, user)| {
                let profile = user.doctor.as_ref()?;
                Some(LeaderboardEntry {
                    rank: i + 1,
                    user_id: user.id.clone(),
                    name: user.name.clone(),
                    specialty: profile.specialty,
                    avatar_url: user.avatar_url.clone(),
                    rank_score: profile.rank_score(),
                    cases_closed: profile.cases_closed,
                    bonus_points: profile.bonus_points,
                    rating: profile.rating,
                })
            })
            .collect();

        Self { entries }
    }

    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The first `limit` entries
    pub fn top(&self, limit: usize) -> &[LeaderboardEntry] {
        &self.entries[..limit.min(self.entries.len())]
    }

    pub fn standing(&self, user_id: &UserId) -> Option<Standing> {
        let index = self.entries.iter().position(|e| &e.user_id == user_id)?;
        let entry = self.entries[index].clone();
        let points_to_next = index
            .checked_sub(1)
            .map(|above| self.entries[above].rank_score - entry.rank_score + 1);
        Some(Standing {
            entry,
            points_to_next,
        })
    }
}
