//! Shared test harness: in-memory repositories, a settable clock and
//! fixture builders

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use parking_lot::{Mutex, RwLock};
use school_service::config::Config;
use school_service::contract::*;
use school_service::domain::repository::*;
use school_service::domain::{Clock, EventPublisher, SchoolEvent, Service};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

pub const SCHOOL_LAT: f64 = 42.8746;
pub const SCHOOL_LON: f64 = 74.6122;

// ===== Clock =====

/// Clock that only moves when told to
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Monday 2025-03-03, 12:00 UTC: inside the default attendance window
pub fn school_noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 3, 12, 0, 0).unwrap()
}

// ===== Event recording =====

#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<SchoolEvent>>,
}

impl RecordingPublisher {
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(SchoolEvent::name).collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &SchoolEvent) -> anyhow::Result<()> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

// ===== In-memory storage =====

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<i64, User>,
    password_hashes: HashMap<i64, String>,
    tokens: HashMap<String, AuthToken>,
    links: BTreeMap<i64, ParentChild>,
    schools: BTreeMap<i64, School>,
    classes: BTreeMap<i64, SchoolClass>,
    subjects: BTreeMap<i64, Subject>,
    schedules: BTreeMap<i64, Schedule>,
    homework: BTreeMap<Uuid, Homework>,
    submissions: BTreeMap<i64, SubmittedHomework>,
    grades: BTreeMap<i64, Grade>,
    attendance: BTreeMap<i64, Attendance>,
    achievements: BTreeMap<i64, Achievement>,
    awards: BTreeMap<i64, UserAchievement>,
    profiles: BTreeMap<i64, UserProfile>,
    ranks: Vec<LeaderboardRank>,
    notifications: BTreeMap<i64, Notification>,
    /// Students whose attendance writes fail like a broken connection
    unwritable_attendance: HashSet<i64>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Mirror the foreign-key actions of the SQL schema
    fn remove_user(&mut self, id: i64) {
        self.password_hashes.remove(&id);
        self.tokens.retain(|_, t| t.user_id != id);
        self.links.retain(|_, l| l.parent_id != id && l.child_id != id);
        for class in self.classes.values_mut() {
            class.student_ids.retain(|s| *s != id);
            class.teacher_ids.retain(|t| *t != id);
        }
        self.schedules.retain(|_, s| s.teacher_id != id);
        self.submissions.retain(|_, s| s.student_id != id);
        self.grades.retain(|_, g| g.student_id != id);
        for grade in self.grades.values_mut() {
            if grade.teacher_id == Some(id) {
                grade.teacher_id = None;
            }
        }
        self.attendance.retain(|_, a| a.student_id != id);
        self.notifications.retain(|_, n| n.user_id != id);
        let profile_ids: Vec<i64> = self
            .profiles
            .values()
            .filter(|p| p.user_id == id)
            .map(|p| p.id)
            .collect();
        for profile_id in profile_ids {
            self.remove_profile(profile_id);
        }
    }

    fn remove_profile(&mut self, id: i64) {
        self.profiles.remove(&id);
        self.awards.retain(|_, a| a.profile_id != id);
        self.ranks.retain(|r| r.profile_id != id);
    }

    fn remove_class(&mut self, id: i64) {
        self.classes.remove(&id);
        self.links.retain(|_, l| l.class_id != id);
        let homework_ids: Vec<Uuid> = self
            .homework
            .values()
            .filter(|h| h.class_id == id)
            .map(|h| h.id)
            .collect();
        for homework_id in homework_ids {
            self.homework.remove(&homework_id);
            self.submissions.retain(|_, s| s.homework_id != homework_id);
        }
        self.attendance.retain(|_, a| a.class_id != id);
        for schedule in self.schedules.values_mut() {
            if schedule.class_id == Some(id) {
                schedule.class_id = None;
            }
        }
        for profile in self.profiles.values_mut() {
            if profile.class_id == Some(id) {
                profile.class_id = None;
            }
        }
    }
}

fn within<T: PartialEq>(allowed: &Option<Vec<T>>, value: &T) -> bool {
    allowed.as_ref().map_or(true, |ids| ids.contains(value))
}

type Hook = Box<dyn FnOnce() + Send>;

/// Every repository trait over one shared set of tables
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    after_award_scan: Arc<Mutex<Option<Hook>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repositories(&self) -> Repositories {
        Repositories {
            users: Arc::new(self.clone()),
            tokens: Arc::new(self.clone()),
            families: Arc::new(self.clone()),
            schools: Arc::new(self.clone()),
            classes: Arc::new(self.clone()),
            subjects: Arc::new(self.clone()),
            schedules: Arc::new(self.clone()),
            homework: Arc::new(self.clone()),
            submissions: Arc::new(self.clone()),
            grades: Arc::new(self.clone()),
            attendance: Arc::new(self.clone()),
            achievements: Arc::new(self.clone()),
            profiles: Arc::new(self.clone()),
            notifications: Arc::new(self.clone()),
        }
    }

    pub fn token_count(&self) -> usize {
        self.tables.read().tokens.len()
    }

    pub fn token_of(&self, user_id: i64) -> Option<AuthToken> {
        self.tables
            .read()
            .tokens
            .values()
            .find(|t| t.user_id == user_id)
            .cloned()
    }

    /// Run `hook` once, right after the next award listing has been read
    pub fn after_next_award_scan(&self, hook: impl FnOnce() + Send + 'static) {
        *self.after_award_scan.lock() = Some(Box::new(hook));
    }

    /// Store an award row without touching XP
    pub fn grant(&self, profile_id: i64, achievement_id: i64, at: DateTime<Utc>) {
        let mut t = self.tables.write();
        let id = t.next_id();
        t.awards.insert(
            id,
            UserAchievement {
                id,
                profile_id,
                achievement_id,
                achieved_at: at,
            },
        );
    }

    pub fn fail_attendance_writes_for(&self, student_id: i64) {
        self.tables.write().unwritable_attendance.insert(student_id);
    }

    pub fn attendance_rows(&self) -> Vec<Attendance> {
        self.tables.read().attendance.values().cloned().collect()
    }

    pub fn profile_of(&self, user_id: i64) -> Option<UserProfile> {
        self.tables
            .read()
            .profiles
            .values()
            .find(|p| p.user_id == user_id)
            .cloned()
    }

    pub fn stored_ranks(&self) -> Vec<LeaderboardRank> {
        self.tables.read().ranks.clone()
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create(
        &self,
        user: &User,
        password_hash: &str,
    ) -> anyhow::Result<(User, UserProfile)> {
        let mut t = self.tables.write();
        let mut user = user.clone();
        user.id = t.next_id();
        t.password_hashes.insert(user.id, password_hash.to_string());
        t.users.insert(user.id, user.clone());
        let profile = UserProfile {
            id: t.next_id(),
            user_id: user.id,
            xp: 0,
            level: 1,
            class_id: None,
        };
        t.profiles.insert(profile.id, profile.clone());
        Ok((user, profile))
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        Ok(self.tables.read().users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .tables
            .read()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn password_hash(&self, user_id: i64) -> anyhow::Result<Option<String>> {
        Ok(self.tables.read().password_hashes.get(&user_id).cloned())
    }

    async fn set_password_hash(&self, user_id: i64, password_hash: &str) -> anyhow::Result<()> {
        self.tables
            .write()
            .password_hashes
            .insert(user_id, password_hash.to_string());
        Ok(())
    }

    async fn list(&self, filter: &UserFilter) -> anyhow::Result<Vec<User>> {
        Ok(self
            .tables
            .read()
            .users
            .values()
            .filter(|u| within(&filter.ids, &u.id))
            .filter(|u| filter.role.map_or(true, |role| u.role == role))
            .cloned()
            .collect())
    }

    async fn update(&self, user: &User) -> anyhow::Result<User> {
        let mut t = self.tables.write();
        anyhow::ensure!(t.users.contains_key(&user.id), "user {} missing", user.id);
        t.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let mut t = self.tables.write();
        let existed = t.users.remove(&id).is_some();
        if existed {
            t.remove_user(id);
        }
        Ok(existed)
    }
}

#[async_trait]
impl TokenRepository for InMemoryStore {
    async fn find(&self, key: &str) -> anyhow::Result<Option<AuthToken>> {
        Ok(self.tables.read().tokens.get(key).cloned())
    }

    async fn find_by_user(&self, user_id: i64) -> anyhow::Result<Option<AuthToken>> {
        Ok(self.token_of(user_id))
    }

    async fn create(&self, token: &AuthToken) -> anyhow::Result<AuthToken> {
        let mut t = self.tables.write();
        anyhow::ensure!(
            !t.tokens.values().any(|existing| existing.user_id == token.user_id),
            "user {} already has a token",
            token.user_id
        );
        t.tokens.insert(token.key.clone(), token.clone());
        Ok(token.clone())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.tables.write().tokens.remove(key).is_some())
    }
}

#[async_trait]
impl FamilyRepository for InMemoryStore {
    async fn create(&self, link: &ParentChild) -> anyhow::Result<ParentChild> {
        let mut t = self.tables.write();
        let mut link = link.clone();
        link.id = t.next_id();
        t.links.insert(link.id, link.clone());
        Ok(link)
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<ParentChild>> {
        Ok(self.tables.read().links.get(&id).cloned())
    }

    async fn list(&self, filter: &ParentChildFilter) -> anyhow::Result<Vec<ParentChild>> {
        Ok(self
            .tables
            .read()
            .links
            .values()
            .filter(|l| filter.parent_id.map_or(true, |id| l.parent_id == id))
            .filter(|l| filter.child_id.map_or(true, |id| l.child_id == id))
            .cloned()
            .collect())
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        Ok(self.tables.write().links.remove(&id).is_some())
    }
}

#[async_trait]
impl SchoolRepository for InMemoryStore {
    async fn create(&self, school: &School) -> anyhow::Result<School> {
        let mut t = self.tables.write();
        let mut school = school.clone();
        school.id = t.next_id();
        t.schools.insert(school.id, school.clone());
        Ok(school)
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<School>> {
        Ok(self.tables.read().schools.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> anyhow::Result<Option<School>> {
        Ok(self
            .tables
            .read()
            .schools
            .values()
            .find(|s| s.name == name)
            .cloned())
    }

    async fn list(&self) -> anyhow::Result<Vec<School>> {
        Ok(self.tables.read().schools.values().cloned().collect())
    }

    async fn update(&self, school: &School) -> anyhow::Result<School> {
        self.tables.write().schools.insert(school.id, school.clone());
        Ok(school.clone())
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let mut t = self.tables.write();
        let existed = t.schools.remove(&id).is_some();
        if existed {
            for user in t.users.values_mut() {
                if user.school_id == Some(id) {
                    user.school_id = None;
                }
            }
            let class_ids: Vec<i64> = t
                .classes
                .values()
                .filter(|c| c.school_id == id)
                .map(|c| c.id)
                .collect();
            for class_id in class_ids {
                t.remove_class(class_id);
            }
        }
        Ok(existed)
    }
}

#[async_trait]
impl ClassRepository for InMemoryStore {
    async fn create(&self, class: &SchoolClass) -> anyhow::Result<SchoolClass> {
        let mut t = self.tables.write();
        let mut class = class.clone();
        class.id = t.next_id();
        t.classes.insert(class.id, class.clone());
        Ok(class)
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<SchoolClass>> {
        Ok(self.tables.read().classes.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> anyhow::Result<Option<SchoolClass>> {
        Ok(self
            .tables
            .read()
            .classes
            .values()
            .find(|c| c.name == name)
            .cloned())
    }

    async fn list(&self, filter: &ClassFilter) -> anyhow::Result<Vec<SchoolClass>> {
        Ok(self
            .tables
            .read()
            .classes
            .values()
            .filter(|c| within(&filter.ids, &c.id))
            .filter(|c| {
                filter
                    .student_ids
                    .as_ref()
                    .map_or(true, |ids| c.student_ids.iter().any(|s| ids.contains(s)))
            })
            .filter(|c| {
                filter
                    .teacher_id
                    .map_or(true, |id| c.teacher_ids.contains(&id))
            })
            .cloned()
            .collect())
    }

    async fn update(&self, class: &SchoolClass) -> anyhow::Result<SchoolClass> {
        self.tables.write().classes.insert(class.id, class.clone());
        Ok(class.clone())
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let mut t = self.tables.write();
        let existed = t.classes.contains_key(&id);
        if existed {
            t.remove_class(id);
        }
        Ok(existed)
    }
}

#[async_trait]
impl SubjectRepository for InMemoryStore {
    async fn create(&self, subject: &Subject) -> anyhow::Result<Subject> {
        let mut t = self.tables.write();
        let mut subject = subject.clone();
        subject.id = t.next_id();
        t.subjects.insert(subject.id, subject.clone());
        Ok(subject)
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Subject>> {
        Ok(self.tables.read().subjects.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> anyhow::Result<Option<Subject>> {
        Ok(self
            .tables
            .read()
            .subjects
            .values()
            .find(|s| s.name == name)
            .cloned())
    }

    async fn list(&self, filter: &SubjectFilter) -> anyhow::Result<Vec<Subject>> {
        Ok(self
            .tables
            .read()
            .subjects
            .values()
            .filter(|s| within(&filter.ids, &s.id))
            .cloned()
            .collect())
    }

    async fn update(&self, subject: &Subject) -> anyhow::Result<Subject> {
        self.tables
            .write()
            .subjects
            .insert(subject.id, subject.clone());
        Ok(subject.clone())
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let mut t = self.tables.write();
        let existed = t.subjects.remove(&id).is_some();
        if existed {
            for class in t.classes.values_mut() {
                class.subject_ids.retain(|s| *s != id);
            }
            t.schedules.retain(|_, s| s.subject_id != id);
            t.grades.retain(|_, g| g.subject_id != id);
        }
        Ok(existed)
    }
}

#[async_trait]
impl ScheduleRepository for InMemoryStore {
    async fn create(&self, schedule: &Schedule) -> anyhow::Result<Schedule> {
        let mut t = self.tables.write();
        let mut schedule = schedule.clone();
        schedule.id = t.next_id();
        t.schedules.insert(schedule.id, schedule.clone());
        Ok(schedule)
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Schedule>> {
        Ok(self.tables.read().schedules.get(&id).cloned())
    }

    async fn find_slot(
        &self,
        class_id: Option<i64>,
        subject_id: i64,
        weekday: u8,
        start_time: NaiveTime,
    ) -> anyhow::Result<Option<Schedule>> {
        Ok(self
            .tables
            .read()
            .schedules
            .values()
            .find(|s| {
                s.class_id == class_id
                    && s.subject_id == subject_id
                    && s.weekday == weekday
                    && s.start_time == start_time
            })
            .cloned())
    }

    async fn list(&self, filter: &ScheduleFilter) -> anyhow::Result<Vec<Schedule>> {
        Ok(self
            .tables
            .read()
            .schedules
            .values()
            .filter(|s| filter.teacher_id.map_or(true, |id| s.teacher_id == id))
            .filter(|s| {
                filter.class_ids.as_ref().map_or(true, |ids| {
                    s.class_id.is_some_and(|class_id| ids.contains(&class_id))
                })
            })
            .cloned()
            .collect())
    }

    async fn update(&self, schedule: &Schedule) -> anyhow::Result<Schedule> {
        self.tables
            .write()
            .schedules
            .insert(schedule.id, schedule.clone());
        Ok(schedule.clone())
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        Ok(self.tables.write().schedules.remove(&id).is_some())
    }
}

#[async_trait]
impl HomeworkRepository for InMemoryStore {
    async fn create(&self, homework: &Homework) -> anyhow::Result<Homework> {
        self.tables
            .write()
            .homework
            .insert(homework.id, homework.clone());
        Ok(homework.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Homework>> {
        Ok(self.tables.read().homework.get(&id).cloned())
    }

    async fn list(&self, filter: &HomeworkFilter) -> anyhow::Result<Vec<Homework>> {
        Ok(self
            .tables
            .read()
            .homework
            .values()
            .filter(|h| within(&filter.class_ids, &h.class_id))
            .cloned()
            .collect())
    }

    async fn update(&self, homework: &Homework) -> anyhow::Result<Homework> {
        self.tables
            .write()
            .homework
            .insert(homework.id, homework.clone());
        Ok(homework.clone())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut t = self.tables.write();
        let existed = t.homework.remove(&id).is_some();
        t.submissions.retain(|_, s| s.homework_id != id);
        Ok(existed)
    }
}

#[async_trait]
impl SubmissionRepository for InMemoryStore {
    async fn create(&self, submission: &SubmittedHomework) -> anyhow::Result<SubmittedHomework> {
        let mut t = self.tables.write();
        let mut submission = submission.clone();
        submission.id = t.next_id();
        t.submissions.insert(submission.id, submission.clone());
        Ok(submission)
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<SubmittedHomework>> {
        Ok(self.tables.read().submissions.get(&id).cloned())
    }

    async fn find_for(
        &self,
        homework_id: Uuid,
        student_id: i64,
    ) -> anyhow::Result<Option<SubmittedHomework>> {
        Ok(self
            .tables
            .read()
            .submissions
            .values()
            .find(|s| s.homework_id == homework_id && s.student_id == student_id)
            .cloned())
    }

    async fn list(&self, filter: &SubmissionFilter) -> anyhow::Result<Vec<SubmittedHomework>> {
        Ok(self
            .tables
            .read()
            .submissions
            .values()
            .filter(|s| within(&filter.student_ids, &s.student_id))
            .filter(|s| within(&filter.homework_ids, &s.homework_id))
            .cloned()
            .collect())
    }

    async fn update(&self, submission: &SubmittedHomework) -> anyhow::Result<SubmittedHomework> {
        self.tables
            .write()
            .submissions
            .insert(submission.id, submission.clone());
        Ok(submission.clone())
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        Ok(self.tables.write().submissions.remove(&id).is_some())
    }
}

#[async_trait]
impl GradeRepository for InMemoryStore {
    async fn create(&self, grade: &Grade) -> anyhow::Result<Grade> {
        let mut t = self.tables.write();
        let mut grade = grade.clone();
        grade.id = t.next_id();
        t.grades.insert(grade.id, grade.clone());
        Ok(grade)
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Grade>> {
        Ok(self.tables.read().grades.get(&id).cloned())
    }

    async fn list(&self, filter: &GradeFilter) -> anyhow::Result<Vec<Grade>> {
        Ok(self
            .tables
            .read()
            .grades
            .values()
            .filter(|g| within(&filter.student_ids, &g.student_id))
            .filter(|g| filter.teacher_id.map_or(true, |id| g.teacher_id == Some(id)))
            .cloned()
            .collect())
    }

    async fn update(&self, grade: &Grade) -> anyhow::Result<Grade> {
        self.tables.write().grades.insert(grade.id, grade.clone());
        Ok(grade.clone())
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        Ok(self.tables.write().grades.remove(&id).is_some())
    }
}

#[async_trait]
impl AttendanceRepository for InMemoryStore {
    async fn create(&self, attendance: &Attendance) -> anyhow::Result<Attendance> {
        let mut t = self.tables.write();
        anyhow::ensure!(
            !t.attendance
                .values()
                .any(|a| a.student_id == attendance.student_id && a.date == attendance.date),
            "duplicate attendance row"
        );
        let mut attendance = attendance.clone();
        attendance.id = t.next_id();
        t.attendance.insert(attendance.id, attendance.clone());
        Ok(attendance)
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Attendance>> {
        Ok(self.tables.read().attendance.get(&id).cloned())
    }

    async fn find_for_day(
        &self,
        student_id: i64,
        date: NaiveDate,
    ) -> anyhow::Result<Option<Attendance>> {
        Ok(self
            .tables
            .read()
            .attendance
            .values()
            .find(|a| a.student_id == student_id && a.date == date)
            .cloned())
    }

    async fn list(&self, filter: &AttendanceFilter) -> anyhow::Result<Vec<Attendance>> {
        Ok(self
            .tables
            .read()
            .attendance
            .values()
            .filter(|a| within(&filter.student_ids, &a.student_id))
            .filter(|a| within(&filter.class_ids, &a.class_id))
            .filter(|a| filter.date.map_or(true, |date| a.date == date))
            .filter(|a| filter.status.map_or(true, |status| a.status == status))
            .cloned()
            .collect())
    }

    async fn update(&self, attendance: &Attendance) -> anyhow::Result<Attendance> {
        self.tables
            .write()
            .attendance
            .insert(attendance.id, attendance.clone());
        Ok(attendance.clone())
    }

    async fn upsert(&self, input: &NewAttendance) -> anyhow::Result<(Attendance, bool)> {
        let mut t = self.tables.write();
        if t.unwritable_attendance.contains(&input.student_id) {
            anyhow::bail!("connection reset while writing attendance");
        }
        let existing = t
            .attendance
            .values_mut()
            .find(|a| a.student_id == input.student_id && a.date == input.date);
        if let Some(row) = existing {
            row.class_id = input.class_id;
            row.school_id = input.school_id;
            row.status = input.status;
            row.location = input.location;
            if input.notes.is_some() {
                row.notes = input.notes.clone();
            }
            return Ok((row.clone(), false));
        }

        let row = Attendance {
            id: t.next_id(),
            student_id: input.student_id,
            class_id: input.class_id,
            school_id: input.school_id,
            date: input.date,
            status: input.status,
            notes: input.notes.clone(),
            location: input.location,
        };
        t.attendance.insert(row.id, row.clone());
        Ok((row, true))
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        Ok(self.tables.write().attendance.remove(&id).is_some())
    }
}

#[async_trait]
impl AchievementRepository for InMemoryStore {
    async fn create(&self, achievement: &Achievement) -> anyhow::Result<Achievement> {
        let mut t = self.tables.write();
        let mut achievement = achievement.clone();
        achievement.id = t.next_id();
        t.achievements.insert(achievement.id, achievement.clone());
        Ok(achievement)
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Achievement>> {
        Ok(self.tables.read().achievements.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> anyhow::Result<Option<Achievement>> {
        Ok(self
            .tables
            .read()
            .achievements
            .values()
            .find(|a| a.name == name)
            .cloned())
    }

    async fn list(&self) -> anyhow::Result<Vec<Achievement>> {
        Ok(self.tables.read().achievements.values().cloned().collect())
    }

    async fn update(&self, achievement: &Achievement) -> anyhow::Result<Achievement> {
        self.tables
            .write()
            .achievements
            .insert(achievement.id, achievement.clone());
        Ok(achievement.clone())
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let mut t = self.tables.write();
        let existed = t.achievements.remove(&id).is_some();
        t.awards.retain(|_, a| a.achievement_id != id);
        Ok(existed)
    }

    async fn award(
        &self,
        award: &UserAchievement,
        profile: &UserProfile,
    ) -> anyhow::Result<UserAchievement> {
        let mut t = self.tables.write();
        anyhow::ensure!(t.profiles.contains_key(&profile.id), "profile not found");
        let mut award = award.clone();
        award.id = t.next_id();
        t.awards.insert(award.id, award.clone());
        t.profiles.insert(profile.id, profile.clone());
        Ok(award)
    }

    async fn find_award(&self, id: i64) -> anyhow::Result<Option<UserAchievement>> {
        Ok(self.tables.read().awards.get(&id).cloned())
    }

    async fn find_award_for(
        &self,
        profile_id: i64,
        achievement_id: i64,
    ) -> anyhow::Result<Option<UserAchievement>> {
        Ok(self
            .tables
            .read()
            .awards
            .values()
            .find(|a| a.profile_id == profile_id && a.achievement_id == achievement_id)
            .cloned())
    }

    async fn list_awards(&self, filter: &AwardFilter) -> anyhow::Result<Vec<UserAchievement>> {
        let awards = self
            .tables
            .read()
            .awards
            .values()
            .filter(|a| within(&filter.profile_ids, &a.profile_id))
            .filter(|a| {
                filter
                    .achievement_id
                    .map_or(true, |id| a.achievement_id == id)
            })
            .cloned()
            .collect();
        let hook = self.after_award_scan.lock().take();
        if let Some(hook) = hook {
            hook();
        }
        Ok(awards)
    }

    async fn revoke(&self, id: i64, profile: Option<&UserProfile>) -> anyhow::Result<bool> {
        let mut t = self.tables.write();
        let existed = t.awards.remove(&id).is_some();
        if let Some(profile) = profile {
            t.profiles.insert(profile.id, profile.clone());
        }
        Ok(existed)
    }
}

#[async_trait]
impl ProfileRepository for InMemoryStore {
    async fn create(&self, profile: &UserProfile) -> anyhow::Result<UserProfile> {
        let mut t = self.tables.write();
        let mut profile = profile.clone();
        profile.id = t.next_id();
        t.profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<UserProfile>> {
        Ok(self.tables.read().profiles.get(&id).cloned())
    }

    async fn find_by_user(&self, user_id: i64) -> anyhow::Result<Option<UserProfile>> {
        Ok(self.profile_of(user_id))
    }

    async fn list(&self, filter: &ProfileFilter) -> anyhow::Result<Vec<UserProfile>> {
        Ok(self
            .tables
            .read()
            .profiles
            .values()
            .filter(|p| within(&filter.user_ids, &p.user_id))
            .cloned()
            .collect())
    }

    async fn update(&self, profile: &UserProfile) -> anyhow::Result<UserProfile> {
        self.tables
            .write()
            .profiles
            .insert(profile.id, profile.clone());
        Ok(profile.clone())
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let mut t = self.tables.write();
        let existed = t.profiles.contains_key(&id);
        t.remove_profile(id);
        Ok(existed)
    }

    async fn replace_ranks(&self, ranks: &[LeaderboardRank]) -> anyhow::Result<()> {
        self.tables.write().ranks = ranks.to_vec();
        Ok(())
    }

    async fn find_rank(&self, profile_id: i64) -> anyhow::Result<Option<LeaderboardRank>> {
        Ok(self
            .tables
            .read()
            .ranks
            .iter()
            .find(|r| r.profile_id == profile_id)
            .cloned())
    }
}

#[async_trait]
impl NotificationRepository for InMemoryStore {
    async fn create(&self, notification: &Notification) -> anyhow::Result<Notification> {
        let mut t = self.tables.write();
        let mut notification = notification.clone();
        notification.id = t.next_id();
        t.notifications
            .insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Notification>> {
        Ok(self.tables.read().notifications.get(&id).cloned())
    }

    async fn list(&self, filter: &NotificationFilter) -> anyhow::Result<Vec<Notification>> {
        Ok(self
            .tables
            .read()
            .notifications
            .values()
            .filter(|n| filter.user_id.map_or(true, |id| n.user_id == id))
            .cloned()
            .collect())
    }

    async fn update(&self, notification: &Notification) -> anyhow::Result<Notification> {
        self.tables
            .write()
            .notifications
            .insert(notification.id, notification.clone());
        Ok(notification.clone())
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        Ok(self.tables.write().notifications.remove(&id).is_some())
    }
}

// ===== Fixtures =====

/// Service over a fresh in-memory store, with handles for inspection
pub struct TestEnv {
    pub service: Arc<Service>,
    pub store: InMemoryStore,
    pub clock: Arc<FixedClock>,
    pub events: Arc<RecordingPublisher>,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let store = InMemoryStore::new();
        let clock = Arc::new(FixedClock::at(school_noon()));
        let events = Arc::new(RecordingPublisher::default());
        let service = Service::new(store.repositories(), config, clock.clone())
            .with_publisher(events.clone());
        Self {
            service: Arc::new(service),
            store,
            clock,
            events,
        }
    }

    /// Store a user directly, with a profile, skipping password hashing
    pub async fn user(&self, username: &str, role: Role, school_id: Option<i64>) -> User {
        let user = User {
            id: 0,
            username: username.to_string(),
            email: format!("{username}@school.test"),
            first_name: username.to_string(),
            last_name: "Test".to_string(),
            role,
            school_id,
            is_staff: false,
            is_active: true,
            date_joined: self.clock.now(),
        };
        let (user, _profile) = UserRepository::create(&self.store, &user, "$unusable")
            .await
            .unwrap();
        user
    }

    pub async fn staff(&self, username: &str) -> User {
        let mut user = self.user(username, Role::Teacher, None).await;
        user.is_staff = true;
        UserRepository::update(&self.store, &user).await.unwrap()
    }

    pub async fn school(&self, name: &str) -> School {
        SchoolRepository::create(
            &self.store,
            &School {
                id: 0,
                name: name.to_string(),
                address: "1 Main Street".to_string(),
                phone: None,
                email: "office@school.test".to_string(),
                website: None,
                established_date: None,
                location: Some(GeoPoint::new(SCHOOL_LAT, SCHOOL_LON)),
            },
        )
        .await
        .unwrap()
    }

    pub async fn class(
        &self,
        name: &str,
        school_id: i64,
        students: &[&User],
        teachers: &[&User],
    ) -> SchoolClass {
        ClassRepository::create(
            &self.store,
            &SchoolClass {
                id: 0,
                name: name.to_string(),
                school_id,
                student_ids: students.iter().map(|u| u.id).collect(),
                teacher_ids: teachers.iter().map(|u| u.id).collect(),
                subject_ids: Vec::new(),
            },
        )
        .await
        .unwrap()
    }

    pub async fn subject(&self, name: &str) -> Subject {
        SubjectRepository::create(
            &self.store,
            &Subject {
                id: 0,
                name: name.to_string(),
            },
        )
        .await
        .unwrap()
    }

    pub async fn link_parent(&self, parent: &User, child: &User, class_id: i64) -> ParentChild {
        FamilyRepository::create(
            &self.store,
            &ParentChild {
                id: 0,
                parent_id: parent.id,
                child_id: child.id,
                class_id,
            },
        )
        .await
        .unwrap()
    }
}

/// One school with a class of two students, their teacher and a parent
pub struct Classroom {
    pub school: School,
    pub class: SchoolClass,
    pub subject: Subject,
    pub teacher: User,
    pub alice: User,
    pub bob: User,
    pub parent: User,
    pub staff: User,
}

impl Classroom {
    pub async fn build(env: &TestEnv) -> Self {
        let school = env.school("School 5").await;
        let teacher = env.user("teacher", Role::Teacher, Some(school.id)).await;
        let alice = env.user("alice", Role::Student, Some(school.id)).await;
        let bob = env.user("bob", Role::Student, Some(school.id)).await;
        let parent = env.user("parent", Role::Parent, None).await;
        let staff = env.staff("admin").await;
        let class = env.class("7A", school.id, &[&alice, &bob], &[&teacher]).await;
        let subject = env.subject("Math").await;
        env.link_parent(&parent, &alice, class.id).await;
        Self {
            school,
            class,
            subject,
            teacher,
            alice,
            bob,
            parent,
            staff,
        }
    }
}

pub fn new_user(username: &str, role: Role) -> NewUser {
    NewUser {
        username: username.to_string(),
        email: format!("{username}@school.test"),
        password: "correct-horse".to_string(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        role,
        school_id: None,
        is_staff: false,
    }
}
