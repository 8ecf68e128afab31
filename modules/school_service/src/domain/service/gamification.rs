//! Achievements, XP, profiles and leaderboards

use super::{internal, Service};
use crate::contract::{
    Achievement, AchievementPatch, AttendanceStatus, LeaderboardEntry, LeaderboardMetric,
    LeaderboardRank, ListQuery, NewAchievement, Page, ProfilePatch, Role, SchoolError, User,
    UserAchievement, UserProfile,
};
use crate::domain::access::{require_staff, require_teacher_or_staff};
use crate::domain::events::SchoolEvent;
use crate::domain::leaderboard::{rank_profiles, ScoredProfile};
use crate::domain::repository::{
    AttendanceFilter, AwardFilter, GradeFilter, ProfileFilter, UserFilter,
};
use crate::domain::validation::validate_text;
use std::collections::HashMap;
use std::sync::Arc;

const ACHIEVEMENT_NAME_MAX_LEN: usize = 100;
const DESCRIPTION_MAX_LEN: usize = 2_000;

impl Service {
    // ===== Achievements =====

    /// Readable by every authenticated user
    pub async fn list_achievements(
        &self,
        _actor: &User,
        query: &ListQuery,
    ) -> Result<Page<Achievement>, SchoolError> {
        let achievements = self.repos.achievements.list().await.map_err(internal)?;
        self.page(achievements, query)
    }

    pub async fn get_achievement(
        &self,
        _actor: &User,
        id: i64,
    ) -> Result<Achievement, SchoolError> {
        self.repos
            .achievements
            .find_by_id(id)
            .await
            .map_err(internal)?
            .ok_or_else(|| SchoolError::not_found("achievement", id))
    }

    pub async fn create_achievement(
        &self,
        actor: &User,
        input: NewAchievement,
    ) -> Result<Achievement, SchoolError> {
        require_staff(actor)?;
        let achievement = Achievement {
            id: 0,
            name: input.name.trim().to_string(),
            description: input.description,
            icon: input.icon,
            xp_reward: input.xp_reward,
        };
        self.check_achievement(&achievement).await?;

        let achievement = self
            .repos
            .achievements
            .create(&achievement)
            .await
            .map_err(internal)?;
        self.emit(SchoolEvent::AchievementChanged {
            achievement_id: achievement.id,
        })
        .await;
        Ok(achievement)
    }

    pub async fn update_achievement(
        &self,
        actor: &User,
        id: i64,
        patch: AchievementPatch,
    ) -> Result<Achievement, SchoolError> {
        require_staff(actor)?;
        let mut achievement = self.get_achievement(actor, id).await?;
        if let Some(name) = patch.name {
            achievement.name = name.trim().to_string();
        }
        if let Some(description) = patch.description {
            achievement.description = description;
        }
        if let Some(icon) = patch.icon {
            achievement.icon = icon;
        }
        if let Some(xp_reward) = patch.xp_reward {
            achievement.xp_reward = xp_reward;
        }
        self.check_achievement(&achievement).await?;

        let achievement = self
            .repos
            .achievements
            .update(&achievement)
            .await
            .map_err(internal)?;
        self.emit(SchoolEvent::AchievementChanged { achievement_id: id })
            .await;
        Ok(achievement)
    }

    /// Awards of the achievement disappear with it; profile XP is left as is
    pub async fn delete_achievement(&self, actor: &User, id: i64) -> Result<(), SchoolError> {
        require_staff(actor)?;
        if !self.repos.achievements.delete(id).await.map_err(internal)? {
            return Err(SchoolError::not_found("achievement", id));
        }
        self.emit(SchoolEvent::AchievementChanged { achievement_id: id })
            .await;
        Ok(())
    }

    async fn check_achievement(&self, achievement: &Achievement) -> Result<(), SchoolError> {
        validate_text("name", &achievement.name, ACHIEVEMENT_NAME_MAX_LEN)?;
        validate_text("description", &achievement.description, DESCRIPTION_MAX_LEN)?;
        let clash = self
            .repos
            .achievements
            .find_by_name(&achievement.name)
            .await
            .map_err(internal)?;
        if clash.is_some_and(|other| other.id != achievement.id) {
            return Err(SchoolError::validation(format!(
                "An achievement named '{}' already exists",
                achievement.name
            )));
        }
        Ok(())
    }

    // ===== Awards =====

    /// Staff see every award, everyone else the awards of their own profile
    pub async fn list_awards(
        &self,
        actor: &User,
        query: &ListQuery,
    ) -> Result<Page<UserAchievement>, SchoolError> {
        let filter = if actor.is_staff {
            AwardFilter::default()
        } else {
            AwardFilter {
                profile_ids: Some(self.own_profile_ids(actor).await?),
                ..Default::default()
            }
        };
        let awards = self
            .repos
            .achievements
            .list_awards(&filter)
            .await
            .map_err(internal)?;
        self.page(awards, query)
    }

    pub async fn get_award(&self, actor: &User, id: i64) -> Result<UserAchievement, SchoolError> {
        let award = self
            .repos
            .achievements
            .find_award(id)
            .await
            .map_err(internal)?
            .ok_or_else(|| SchoolError::not_found("user achievement", id))?;
        if !actor.is_staff && !self.own_profile_ids(actor).await?.contains(&award.profile_id) {
            return Err(SchoolError::not_found("user achievement", id));
        }
        Ok(award)
    }

    /// Grant an achievement and add its XP to the profile
    pub async fn award_achievement(
        &self,
        actor: &User,
        profile_id: i64,
        achievement_id: i64,
    ) -> Result<UserAchievement, SchoolError> {
        require_teacher_or_staff(actor)?;
        let mut profile = self
            .repos
            .profiles
            .find_by_id(profile_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| {
                SchoolError::validation(format!("profile: unknown profile {profile_id}"))
            })?;
        let achievement = self
            .repos
            .achievements
            .find_by_id(achievement_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| {
                SchoolError::validation(format!(
                    "achievement: unknown achievement {achievement_id}"
                ))
            })?;

        let duplicate = self
            .repos
            .achievements
            .find_award_for(profile_id, achievement_id)
            .await
            .map_err(internal)?;
        if duplicate.is_some() {
            return Err(SchoolError::validation(
                "This achievement has already been awarded to the profile",
            ));
        }

        profile.xp = profile.xp.saturating_add(achievement.xp_reward);
        profile.level = self.level_for(profile.xp);
        let award = self
            .repos
            .achievements
            .award(
                &UserAchievement {
                    id: 0,
                    profile_id,
                    achievement_id,
                    achieved_at: self.now(),
                },
                &profile,
            )
            .await
            .map_err(internal)?;

        tracing::info!(
            profile_id,
            achievement_id,
            xp = profile.xp,
            level = profile.level,
            "achievement awarded"
        );
        self.emit(SchoolEvent::AchievementAwarded {
            profile_id,
            achievement_id,
        })
        .await;
        Ok(award)
    }

    /// Take an award back and subtract its XP
    pub async fn revoke_award(&self, actor: &User, id: i64) -> Result<(), SchoolError> {
        require_teacher_or_staff(actor)?;
        let award = self
            .repos
            .achievements
            .find_award(id)
            .await
            .map_err(internal)?
            .ok_or_else(|| SchoolError::not_found("user achievement", id))?;
        let reward = self
            .repos
            .achievements
            .find_by_id(award.achievement_id)
            .await
            .map_err(internal)?
            .map_or(0, |achievement| achievement.xp_reward);

        let profile = self
            .repos
            .profiles
            .find_by_id(award.profile_id)
            .await
            .map_err(internal)?
            .map(|mut profile| {
                profile.xp = profile.xp.saturating_sub(reward);
                profile.level = self.level_for(profile.xp);
                profile
            });
        self.repos
            .achievements
            .revoke(award.id, profile.as_ref())
            .await
            .map_err(internal)?;

        self.emit(SchoolEvent::AchievementRevoked {
            profile_id: award.profile_id,
            achievement_id: award.achievement_id,
        })
        .await;
        Ok(())
    }

    fn level_for(&self, xp: u32) -> u32 {
        1 + xp / self.config.xp_per_level.max(1)
    }

    async fn own_profile_ids(&self, actor: &User) -> Result<Vec<i64>, SchoolError> {
        Ok(self
            .repos
            .profiles
            .find_by_user(actor.id)
            .await
            .map_err(internal)?
            .map(|profile| profile.id)
            .into_iter()
            .collect())
    }

    // ===== Profiles =====

    pub async fn list_profiles(
        &self,
        actor: &User,
        query: &ListQuery,
    ) -> Result<Page<UserProfile>, SchoolError> {
        let filter = if actor.is_staff {
            ProfileFilter::default()
        } else {
            ProfileFilter {
                user_ids: Some(vec![actor.id]),
            }
        };
        let profiles = self.repos.profiles.list(&filter).await.map_err(internal)?;
        self.page(profiles, query)
    }

    pub async fn get_profile(&self, actor: &User, id: i64) -> Result<UserProfile, SchoolError> {
        let profile = self
            .repos
            .profiles
            .find_by_id(id)
            .await
            .map_err(internal)?
            .filter(|profile| actor.is_staff || profile.user_id == actor.id)
            .ok_or_else(|| SchoolError::not_found("profile", id))?;
        Ok(profile)
    }

    pub async fn update_profile(
        &self,
        actor: &User,
        id: i64,
        patch: ProfilePatch,
    ) -> Result<UserProfile, SchoolError> {
        require_staff(actor)?;
        let mut profile = self.get_profile(actor, id).await?;
        if let Some(xp) = patch.xp {
            profile.xp = xp;
        }
        if let Some(level) = patch.level {
            if level == 0 {
                return Err(SchoolError::validation("level must be 1 or greater"));
            }
            profile.level = level;
        }
        if let Some(class_id) = patch.class_id {
            if let Some(class_id) = class_id {
                self.referenced_class(class_id).await?;
            }
            profile.class_id = class_id;
        }
        let profile = self
            .repos
            .profiles
            .update(&profile)
            .await
            .map_err(internal)?;
        self.emit(SchoolEvent::ProfileUpdated {
            profile_id: profile.id,
        })
        .await;
        Ok(profile)
    }

    pub async fn delete_profile(&self, actor: &User, id: i64) -> Result<(), SchoolError> {
        require_staff(actor)?;
        if !self.repos.profiles.delete(id).await.map_err(internal)? {
            return Err(SchoolError::not_found("profile", id));
        }
        self.emit(SchoolEvent::ProfileDeleted { profile_id: id })
            .await;
        Ok(())
    }

    // ===== Leaderboard =====

    /// Cached top rows for a metric; recomputed when missing or stale
    pub async fn leaderboard(
        &self,
        _actor: &User,
        metric: LeaderboardMetric,
    ) -> Result<Arc<Vec<LeaderboardEntry>>, SchoolError> {
        if let Some(rows) = self.leaderboard.get(metric, self.now()) {
            return Ok(rows);
        }
        self.refresh_leaderboard(metric).await
    }

    /// One page of the cached board, searchable by username
    pub async fn leaderboard_page(
        &self,
        actor: &User,
        metric: LeaderboardMetric,
        query: &ListQuery,
    ) -> Result<Page<LeaderboardEntry>, SchoolError> {
        let rows = self.leaderboard(actor, metric).await?;
        self.page((*rows).clone(), query)
    }

    /// Persisted XP rank of a profile, refreshing the XP board when stale
    pub async fn leaderboard_rank(
        &self,
        _actor: &User,
        profile_id: i64,
    ) -> Result<LeaderboardRank, SchoolError> {
        if !self.leaderboard.is_cached(LeaderboardMetric::Xp, self.now()) {
            self.refresh_leaderboard(LeaderboardMetric::Xp).await?;
        }
        self.repos
            .profiles
            .find_rank(profile_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| SchoolError::not_found("leaderboard entry", profile_id))
    }

    async fn refresh_leaderboard(
        &self,
        metric: LeaderboardMetric,
    ) -> Result<Arc<Vec<LeaderboardEntry>>, SchoolError> {
        let computed_at = self.now();
        let generation = self.leaderboard.generation(metric);
        let scored = self.score_profiles(metric).await?;
        let rows = rank_profiles(scored, self.config.leaderboard_size);

        if metric == LeaderboardMetric::Xp {
            let ranks: Vec<LeaderboardRank> = rows
                .iter()
                .map(|row| LeaderboardRank {
                    profile_id: row.profile_id,
                    rank: row.rank,
                })
                .collect();
            self.repos
                .profiles
                .replace_ranks(&ranks)
                .await
                .map_err(internal)?;
        }

        tracing::debug!(
            metric = metric.as_str(),
            rows = rows.len(),
            "leaderboard computed"
        );
        Ok(self.leaderboard.put(metric, rows, computed_at, generation))
    }

    /// Aggregate the metric for every student profile
    async fn score_profiles(
        &self,
        metric: LeaderboardMetric,
    ) -> Result<Vec<ScoredProfile>, SchoolError> {
        let students: HashMap<i64, User> = self
            .repos
            .users
            .list(&UserFilter {
                role: Some(Role::Student),
                ..Default::default()
            })
            .await
            .map_err(internal)?
            .into_iter()
            .map(|user| (user.id, user))
            .collect();
        if students.is_empty() {
            return Ok(Vec::new());
        }
        let profiles = self
            .repos
            .profiles
            .list(&ProfileFilter {
                user_ids: Some(students.keys().copied().collect()),
            })
            .await
            .map_err(internal)?;

        let scores: HashMap<i64, f64> = match metric {
            LeaderboardMetric::Xp => {
                let rewards: HashMap<i64, u32> = self
                    .repos
                    .achievements
                    .list()
                    .await
                    .map_err(internal)?
                    .into_iter()
                    .map(|a| (a.id, a.xp_reward))
                    .collect();
                let mut by_profile: HashMap<i64, f64> = HashMap::new();
                for award in self
                    .repos
                    .achievements
                    .list_awards(&AwardFilter::default())
                    .await
                    .map_err(internal)?
                {
                    let reward = rewards.get(&award.achievement_id).copied().unwrap_or(0);
                    *by_profile.entry(award.profile_id).or_default() += f64::from(reward);
                }
                profiles
                    .iter()
                    .map(|p| (p.id, by_profile.get(&p.id).copied().unwrap_or(0.0)))
                    .collect()
            }
            LeaderboardMetric::Attendance => {
                let mut by_student: HashMap<i64, f64> = HashMap::new();
                for row in self
                    .repos
                    .attendance
                    .list(&AttendanceFilter {
                        status: Some(AttendanceStatus::Present),
                        ..Default::default()
                    })
                    .await
                    .map_err(internal)?
                {
                    *by_student.entry(row.student_id).or_default() += 1.0;
                }
                profiles
                    .iter()
                    .map(|p| (p.id, by_student.get(&p.user_id).copied().unwrap_or(0.0)))
                    .collect()
            }
            LeaderboardMetric::Grades => {
                let mut sums: HashMap<i64, (f64, u32)> = HashMap::new();
                for grade in self
                    .repos
                    .grades
                    .list(&GradeFilter::default())
                    .await
                    .map_err(internal)?
                {
                    let entry = sums.entry(grade.student_id).or_default();
                    entry.0 += grade.value;
                    entry.1 += 1;
                }
                // profiles without grades are left out
                profiles
                    .iter()
                    .filter_map(|p| {
                        sums.get(&p.user_id)
                            .map(|(total, count)| (p.id, total / f64::from(*count)))
                    })
                    .collect()
            }
        };

        Ok(profiles
            .into_iter()
            .filter_map(|profile| {
                let score = scores.get(&profile.id).copied()?;
                let user = students.get(&profile.user_id)?;
                Some(ScoredProfile {
                    profile_id: profile.id,
                    user_id: user.id,
                    username: user.username.clone(),
                    score,
                })
            })
            .collect())
    }
}
