//! Keyword-vocabulary skill extraction and role categorisation.

use indexmap::IndexSet;
use lazy_static::lazy_static;
use regex::Regex;

use crate::rules::payload::contains_word;
use crate::types::job::RoleCategory;

/// Canonical skill name and the pattern that detects it.
const VOCABULARY: &[(&str, &str)] = &[
    // Languages
    ("python", r"\b(?:python|django|flask|fastapi|pandas|numpy)\b"),
    ("javascript", r"\b(?:javascript|js|node\.?js|deno)\b"),
    ("typescript", r"\btypescript\b"),
    ("java", r"\b(?:java|spring|springboot|spring boot|hibernate)\b"),
    ("golang", r"\b(?:golang|go developer|go engineer|go services?)\b"),
    ("rust", r"\b(?:rust|rustlang)\b"),
    ("ruby", r"\b(?:ruby|rails|ruby on rails)\b"),
    ("php", r"\b(?:php|laravel|symfony|wordpress)\b"),
    ("c++", r"(?:\bc\+\+|\bcpp\b)"),
    ("c#", r"(?:\bc#|\bcsharp\b|\.net\b|\bdotnet\b)"),
    ("swift", r"\b(?:swift|swiftui)\b"),
    ("kotlin", r"\bkotlin\b"),
    ("scala", r"\b(?:scala|akka)\b"),
    // Frontend
    ("react", r"\b(?:react|reactjs|react\.js|nextjs|next\.js)\b"),
    ("vue", r"\b(?:vue|vuejs|vue\.js|nuxt)\b"),
    ("angular", r"\b(?:angular|angularjs)\b"),
    ("svelte", r"\b(?:svelte|sveltekit)\b"),
    // Backend frameworks
    ("express", r"\b(?:express\.js|expressjs)\b"),
    ("nestjs", r"\b(?:nestjs|nest\.js)\b"),
    // Databases
    ("postgresql", r"\b(?:postgres|postgresql|psql)\b"),
    ("mysql", r"\b(?:mysql|mariadb)\b"),
    ("mongodb", r"\b(?:mongodb|mongo)\b"),
    ("redis", r"\b(?:redis|valkey)\b"),
    ("elasticsearch", r"\b(?:elasticsearch|opensearch)\b"),
    ("cassandra", r"\bcassandra\b"),
    ("dynamodb", r"\bdynamodb\b"),
    // Cloud
    ("aws", r"\b(?:aws|amazon web services|ec2|s3|lambda|rds|ecs|eks)\b"),
    ("gcp", r"\b(?:gcp|google cloud|gke|bigquery)\b"),
    ("azure", r"\b(?:azure|microsoft azure)\b"),
    // DevOps
    ("docker", r"\b(?:docker|dockerfile|containers?)\b"),
    ("kubernetes", r"\b(?:kubernetes|k8s|kubectl|helm)\b"),
    ("terraform", r"\bterraform\b"),
    ("ansible", r"\bansible\b"),
    ("jenkins", r"\bjenkins\b"),
    ("github actions", r"\b(?:github actions|gh actions)\b"),
    ("gitlab ci", r"\bgitlab[ -]ci\b"),
    ("circleci", r"\b(?:circleci|circle ci)\b"),
    // Observability
    ("prometheus", r"\bprometheus\b"),
    ("grafana", r"\bgrafana\b"),
    ("datadog", r"\bdatadog\b"),
    // Messaging
    ("kafka", r"\b(?:kafka|apache kafka)\b"),
    ("rabbitmq", r"\b(?:rabbitmq|rabbit mq)\b"),
    ("sqs", r"\bsqs\b"),
    // Testing
    ("pytest", r"\bpytest\b"),
    ("jest", r"\bjest\b"),
    ("cypress", r"\bcypress\b"),
    ("selenium", r"\bselenium\b"),
    // Practices
    ("git", r"\b(?:git|github|gitlab|bitbucket)\b"),
    ("ci/cd", r"(?:\bci/cd\b|\bcicd\b|continuous integration|continuous deployment)"),
    ("microservices", r"\b(?:microservices?|micro-services?)\b"),
    ("rest api", r"\b(?:restful|rest apis?)\b"),
    ("graphql", r"\bgraphql\b"),
    ("linux", r"\blinux\b"),
    ("sql", r"\bsql\b"),
];

lazy_static! {
    static ref PATTERNS: Vec<(&'static str, Regex)> = VOCABULARY
        .iter()
        .map(|(name, pattern)| {
            let regex = Regex::new(&format!("(?i){}", pattern)).expect("valid skill pattern");
            (*name, regex)
        })
        .collect();
}

/// Skills found in title + description, sorted by name.
pub fn extract_skills(title: &str, description: &str) -> IndexSet<String> {
    let text = format!("{} {}", title, description);
    let mut found: Vec<&str> = PATTERNS
        .iter()
        .filter(|(_, regex)| regex.is_match(&text))
        .map(|(name, _)| *name)
        .collect();
    found.sort_unstable();
    found.into_iter().map(str::to_string).collect()
}

const NON_TECHNICAL_TITLES: &[&str] = &[
    "sales",
    "account executive",
    "account manager",
    "business development",
    "marketing",
    "recruiter",
    "recruiting",
    "human resources",
    "hr",
    "finance",
    "legal",
    "compliance",
    "customer success",
    "support",
    "copywriter",
    "product manager",
    "product owner",
    "project manager",
    "program manager",
    "business analyst",
    "data analyst",
];

/// Categorise a role from its title, description and extracted skills.
pub fn categorize_role(title: &str, description: &str, skills: &IndexSet<String>) -> RoleCategory {
    let title = title.to_lowercase();
    let text = format!("{} {}", title, description.to_lowercase());
    let has = |skill: &str| skills.contains(skill);
    let word = |w: &str| contains_word(&text, w);

    let engineering_manager =
        title.contains("engineering manager") || title.contains("eng manager");
    if engineering_manager {
        return RoleCategory::Management;
    }
    if NON_TECHNICAL_TITLES.iter().any(|k| contains_word(&title, k)) {
        return RoleCategory::General;
    }
    if ["designer", "ux", "ui", "design lead"]
        .iter()
        .any(|k| contains_word(&title, k))
        && !title.contains("engineer")
        && !title.contains("developer")
    {
        return RoleCategory::General;
    }
    if ["security", "appsec", "devsecops"].iter().any(|k| contains_word(&title, k)) {
        return RoleCategory::Security;
    }
    if ["qa", "sdet", "test engineer", "quality assurance"]
        .iter()
        .any(|k| contains_word(&title, k))
    {
        return RoleCategory::Qa;
    }
    if ["ios", "android", "mobile"].iter().any(|k| contains_word(&title, k)) {
        return RoleCategory::Mobile;
    }
    if title.contains("full stack") || title.contains("fullstack") || title.contains("full-stack") {
        return RoleCategory::Fullstack;
    }

    let frontend = [
        has("react") || has("vue") || has("angular") || has("svelte"),
        word("frontend") || word("front-end") || word("front end"),
        word("ui") || word("ux"),
        word("css") || word("html"),
    ];
    let backend = [
        word("backend") || word("back-end") || word("back end"),
        word("api") || word("apis") || has("rest api") || has("graphql"),
        has("postgresql") || has("mysql") || has("mongodb"),
        has("python") || has("java") || has("golang") || has("ruby") || has("rust"),
    ];
    let devops = [
        word("devops") || word("sre") || text.contains("site reliability"),
        has("docker") || has("kubernetes"),
        has("terraform") || has("ansible"),
        has("ci/cd"),
        has("aws") || has("gcp") || has("azure"),
    ];
    let data = [
        text.contains("data engineer") || text.contains("data scientist"),
        word("spark") || word("airflow"),
        word("etl") || text.contains("data pipeline"),
        word("bigquery") || word("redshift") || word("snowflake"),
    ];
    let ml = [
        text.contains("machine learning") || word("ml"),
        word("ai") || text.contains("artificial intelligence") || word("llm"),
        word("pytorch") || word("tensorflow"),
        word("nlp") || text.contains("computer vision"),
    ];

    let count = |signals: &[bool]| signals.iter().filter(|s| **s).count();
    let frontend_score = count(&frontend);
    let backend_score = count(&backend);

    if frontend_score >= 2 && backend_score >= 2 {
        return RoleCategory::Fullstack;
    }

    // Ties resolve in this order
    let scored = [
        (RoleCategory::Backend, backend_score),
        (RoleCategory::Devops, count(&devops)),
        (RoleCategory::Frontend, frontend_score),
        (RoleCategory::Data, count(&data)),
        (RoleCategory::Ml, count(&ml)),
    ];
    let (best, best_score) = scored
        .iter()
        .fold((RoleCategory::General, 0), |acc, (category, score)| {
            if *score > acc.1 {
                (*category, *score)
            } else {
                acc
            }
        });

    if best_score == 0 {
        RoleCategory::General
    } else {
        best
    }
}
