//! Homework, submissions and grades

pub mod homework {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "homeworks")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub subject_id: i64,
        pub class_id: i64,
        #[sea_orm(column_type = "Text")]
        pub description: String,
        pub due_date: DateTimeUtc,
        pub created_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod submitted_homework {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "submitted_homeworks")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub homework_id: Uuid,
        pub student_id: i64,
        pub submission_file: String,
        pub submitted_at: DateTimeUtc,
        /// submitted / graded
        pub status: String,
        pub grade: Option<f64>,
        #[sea_orm(column_type = "Text", nullable)]
        pub feedback: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod grade {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "grades")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub student_id: i64,
        pub subject_id: i64,
        pub value: f64,
        pub date: Date,
        pub teacher_id: Option<i64>,
        #[sea_orm(column_type = "Text", nullable)]
        pub comments: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
