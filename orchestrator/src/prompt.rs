//! Role prompts for the planner and worker requests.

use anyhow::Result;
use minijinja::{Environment, context};

use crate::core::policy::GuardrailPolicy;
use crate::core::types::Message;

const PLANNER_SYSTEM_TEMPLATE: &str = include_str!("prompts/planner_system.md");
const PLANNER_USER_TEMPLATE: &str = include_str!("prompts/planner_user.md");
const WORKER_SYSTEM_TEMPLATE: &str = include_str!("prompts/worker_system.md");
const WORKER_USER_TEMPLATE: &str = include_str!("prompts/worker_user.md");

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("planner_system", PLANNER_SYSTEM_TEMPLATE)
            .expect("planner system template should be valid");
        env.add_template("planner_user", PLANNER_USER_TEMPLATE)
            .expect("planner user template should be valid");
        env.add_template("worker_system", WORKER_SYSTEM_TEMPLATE)
            .expect("worker system template should be valid");
        env.add_template("worker_user", WORKER_USER_TEMPLATE)
            .expect("worker user template should be valid");
        Self { env }
    }

    /// Request asking for a short numbered plan for `goal`.
    pub fn planner_messages(&self, goal: &str) -> Result<Vec<Message>> {
        let system = self.env.get_template("planner_system")?.render(context! {})?;
        let user = self
            .env
            .get_template("planner_user")?
            .render(context! { goal => goal })?;
        Ok(vec![Message::system(system), Message::user(user)])
    }

    /// Request asking for the deliverable, one post per line.
    pub fn worker_messages(
        &self,
        goal: &str,
        plan: &str,
        policy: &GuardrailPolicy,
    ) -> Result<Vec<Message>> {
        let spelled = count_word(policy.post_count);
        let system = self
            .env
            .get_template("worker_system")?
            .render(context! { count_word => spelled.as_str() })?;
        let user = self.env.get_template("worker_user")?.render(context! {
            post_count => policy.post_count,
            count_word => spelled.as_str(),
            max_chars => policy.max_chars,
            join_link => policy.join_link.as_str(),
            plan => plan,
            goal => goal,
        })?;
        Ok(vec![Message::system(system), Message::user(user)])
    }
}

fn count_word(n: usize) -> String {
    const WORDS: [&str; 10] = [
        "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    ];
    match n.checked_sub(1).and_then(|i| WORDS.get(i)) {
        Some(word) => (*word).to_string(),
        None => n.to_string(),
    }
}
