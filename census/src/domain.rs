//! Topical domain inference for organization members.
//!
//! Domains are collected in a fixed order of evidence: repository name table, bio keywords,
//! personal repository topics, keyword rules, repository name keywords, and finally a default.
//! The returned list keeps that discovery order.

use std::collections::{BTreeMap, HashMap};

use crate::api::UserRepo;

pub const DEFAULT_DOMAIN: &str = "数据科学";

/// Keyword to domain, matched against bios, topics and repository names.
const KEYWORD_DOMAINS: &[(&str, &str)] = &[
    ("machine-learning", "机器学习"),
    ("deep-learning", "深度学习"),
    ("natural-language-processing", "NLP"),
    ("computer-vision", "计算机视觉"),
    ("data-mining", "数据挖掘"),
    ("recommendation-system", "推荐系统"),
    ("reinforcement-learning", "强化学习"),
    ("artificial-intelligence", "人工智能"),
    ("llm", "LLM"),
    ("data-science", "数据科学"),
    ("frontend", "前端开发"),
    ("backend", "后端开发"),
    ("fullstack", "全栈开发"),
    ("bigdata", "大数据"),
    ("embodied-ai", "具身智能"),
    ("robotics", "具身智能"),
    ("medical-imaging", "医学影像"),
    ("agent", "AI Agent"),
    ("multi-agent", "AI Agent"),
    ("multimodal", "多模态"),
    ("rag", "RAG"),
    ("data-analysis", "数据分析"),
    ("graph-neural-network", "图神经网络"),
];

/// Organization repository to domain. Takes precedence over every keyword match.
const REPO_DOMAINS: &[(&str, &str)] = &[
    ("daily-interview", "面试求职"),
    ("get-job", "面试求职"),
    ("huawei-od-python", "面试求职"),
    ("easy-robot", "具身智能"),
    ("easy-ros2arm", "具身智能"),
    ("every-embodied", "具身智能"),
    ("ai-hardware-robotics", "具身智能"),
    ("white-cloud-robotics", "具身智能"),
    ("med-imaging-primer", "医学影像"),
    ("agent-tutorial", "AI Agent"),
    ("agentic-ai", "AI Agent"),
    ("hello-agents", "AI Agent"),
    ("wow-agent", "AI Agent"),
    ("handy-multi-agent", "AI Agent"),
    ("hugging-multi-agent", "AI Agent"),
    ("easy-langent", "AI Agent"),
    ("handy-ollama", "AI工具"),
    ("handy-n8n", "AI工具"),
    ("self-dify", "AI工具"),
    ("coze-ai-assistant", "AI工具"),
    ("self-llm", "AI工具"),
    ("unlock-hf", "AI工具"),
    ("unlock-deepseek", "AI工具"),
    ("smart-prompt", "AI工具"),
    ("easy-vibe", "AI工具"),
    ("vibe-vibe", "AI工具"),
    ("thorough-pytorch", "框架教程"),
    ("openmmlab-tutorial", "框架教程"),
    ("d2l-ai-solutions-manual", "框架教程"),
    ("fantastic-matplotlib", "框架教程"),
    ("joyful-pandas", "框架教程"),
    ("powerful-numpy", "框架教程"),
    ("wow-plotly", "框架教程"),
    ("all-in-rag", "RAG"),
    ("wow-rag", "RAG"),
    ("easy-vectordb", "RAG"),
    ("easy-vecdb", "RAG"),
    ("llm-cookbook", "LLM"),
    ("llm-universe", "LLM"),
    ("llm-deploy", "LLM"),
    ("llm-research", "LLM"),
    ("llmbook", "LLM"),
    ("llms-from-scratch-cn", "LLM"),
    ("so-large-lm", "LLM"),
    ("happy-llm", "LLM"),
    ("base-llm", "LLM"),
    ("hugging-llm", "LLM"),
    ("hands-on-llm", "LLM"),
    ("hands-on-llama", "LLM"),
    ("code-your-own-llm", "LLM"),
    ("tiny-universe", "LLM"),
    ("post-training-of-llms", "LLM"),
    ("leegenai-tutorial", "LLM"),
    ("hugging-audio", "多模态"),
    ("sora-tutorial", "多模态"),
    ("hugging-vis", "多模态"),
    ("vced", "多模态"),
    ("dive-into-cv-pytorch", "计算机视觉"),
    ("deep-learning-for-computer-vision", "计算机视觉"),
    ("magic-cv", "计算机视觉"),
    ("team-learning-cv", "计算机视觉"),
    ("yolo-master", "计算机视觉"),
    ("easy-dip", "计算机视觉"),
    ("easy-nlp", "NLP"),
    ("base-nlp", "NLP"),
    ("hands-dirty-nlp", "NLP"),
    ("learn-nlp-with-transformers", "NLP"),
    ("team-learning-nlp", "NLP"),
    ("hand-bert", "NLP"),
    ("fun-transformer", "NLP"),
    ("easy-rl", "强化学习"),
    ("joyrl", "强化学习"),
    ("joyrl-book", "强化学习"),
    ("hugging-rl", "强化学习"),
    ("key-book", "强化学习"),
    ("fun-marl", "强化学习"),
    ("team-learning-rl", "强化学习"),
    ("fun-rec", "推荐系统"),
    ("torch-rechub", "推荐系统"),
    ("fun-ir", "推荐系统"),
    ("competition-baseline", "数据竞赛"),
    ("coggle", "数据竞赛"),
    ("hands-on-data-analysis", "数据分析"),
    ("team-learning-data-mining", "数据分析"),
    ("learn-python-the-smart-way", "编程基础"),
    ("learn-python-the-smart-way-v2", "编程基础"),
    ("leetcode-notes", "编程基础"),
    ("team-learning-program", "编程基础"),
    ("team-learning-sql", "编程基础"),
    ("wonderful-sql", "编程基础"),
    ("cstart", "编程基础"),
    ("go-talent", "编程基础"),
    ("wow-fullstack", "全栈开发"),
    ("whale-web", "前端开发"),
    ("sweettalk-django", "后端开发"),
];

/// Any of the keywords maps to the domain. Applied to topics, or repository names without topics.
const KEYWORD_RULES: &[(&[&str], &str)] = &[
    (&["machine-learning", "sklearn"], "机器学习"),
    (&["deep-learning", "pytorch", "tensorflow"], "深度学习"),
    (&["nlp", "natural-language", "bert", "transformer"], "NLP"),
    (&["recommendation", "recommender-system", "ctr-prediction"], "推荐系统"),
    (&["computer-vision", "opencv", "yolo", "image-classification"], "计算机视觉"),
    (&["web", "frontend", "react", "vue", "javascript"], "前端开发"),
    (&["gpt", "llm", "chatbot", "llama", "large-language-model"], "LLM"),
    (&["rag", "retrieval-augmented"], "RAG"),
    (&["agent", "multi-agent", "agentic"], "AI Agent"),
    (&["embodied", "robotics", "robot", "ros2"], "具身智能"),
    (&["medical-imaging", "medical-image"], "医学影像"),
    (&["multimodal", "audio", "speech", "text-to-image"], "多模态"),
    (&["reinforcement-learning", "reinforcement"], "强化学习"),
    (&["hive", "spark", "hadoop"], "大数据"),
    (&["competition", "kaggle"], "数据竞赛"),
    (&["database", "sql", "nosql", "mongodb", "mysql"], "数据库"),
];

#[derive(Debug, Clone)]
pub struct DomainTables {
    repo_domains: HashMap<String, String>,
    keyword_domains: Vec<(String, String)>,
    keyword_rules: Vec<(Vec<String>, String)>,
    default_domain: String,
}

impl Default for DomainTables {
    fn default() -> Self {
        DomainTables {
            repo_domains: REPO_DOMAINS
                .iter()
                .map(|(repo, domain)| (repo.to_string(), domain.to_string()))
                .collect(),
            keyword_domains: KEYWORD_DOMAINS
                .iter()
                .map(|(keyword, domain)| (keyword.to_string(), domain.to_string()))
                .collect(),
            keyword_rules: KEYWORD_RULES
                .iter()
                .map(|(keywords, domain)| (keywords.iter().map(|k| k.to_string()).collect(), domain.to_string()))
                .collect(),
            default_domain: DEFAULT_DOMAIN.to_string(),
        }
    }
}

/// Ordered set of domains.
#[derive(Default)]
struct Domains(Vec<String>);

impl Domains {
    fn add(&mut self, domain: &str) {
        if !self.0.iter().any(|known| known == domain) {
            self.0.push(domain.to_string());
        }
    }
}

impl DomainTables {
    pub fn repo_domain(&self, repo: &str) -> Option<&str> {
        self.repo_domains.get(repo).map(String::as_str)
    }

    pub fn default_domain(&self) -> &str {
        &self.default_domain
    }

    /// Domains of a contributor of `repos`, never empty.
    pub fn infer(&self, repos: &[String], bio: Option<&str>, user_repos: &[UserRepo]) -> Vec<String> {
        let mut domains = Domains::default();

        for repo in repos {
            if let Some(domain) = self.repo_domain(repo) {
                domains.add(domain);
            }
        }

        let bio = bio.unwrap_or_default().to_lowercase();
        if !bio.is_empty() {
            for (keyword, domain) in &self.keyword_domains {
                if bio.contains(keyword.as_str()) || bio.contains(&domain.to_lowercase()) {
                    domains.add(domain);
                }
            }
        }

        let topics = user_repos
            .iter()
            .flat_map(|repo| repo.topics.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        self.add_keyword_domains(&topics, &mut domains);

        let unmapped = repos
            .iter()
            .filter(|repo| self.repo_domain(repo).is_none())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        let rules_text = if topics.trim().is_empty() { &unmapped } else { &topics };
        for (keywords, domain) in &self.keyword_rules {
            if keywords.iter().any(|keyword| rules_text.contains(keyword.as_str())) {
                domains.add(domain);
            }
        }
        self.add_keyword_domains(&unmapped, &mut domains);

        if domains.0.is_empty() {
            domains.add(&self.default_domain);
        }
        domains.0
    }

    fn add_keyword_domains(&self, text: &str, domains: &mut Domains) {
        if text.is_empty() {
            return;
        }
        for (keyword, domain) in &self.keyword_domains {
            if text.contains(keyword.as_str()) {
                domains.add(domain);
            }
        }
    }

    /// Domain with the most commits over the mapped repositories.
    ///
    /// Without commit counts each repository counts once. Falls back to the first inferred domain.
    /// Ties go to the domain reached first.
    pub fn primary(&self, repos: &[String], domains: &[String], repo_commits: Option<&BTreeMap<String, u32>>) -> String {
        let weighted: Vec<(&str, u32)> = match repo_commits.filter(|commits| !commits.is_empty()) {
            Some(commits) => commits.iter().map(|(repo, count)| (repo.as_str(), *count)).collect(),
            None => repos.iter().map(|repo| (repo.as_str(), 1)).collect(),
        };
        let mut counts: Vec<(&str, u32)> = Vec::new();
        for (repo, weight) in weighted {
            if let Some(domain) = self.repo_domain(repo) {
                match counts.iter_mut().find(|(known, _)| *known == domain) {
                    Some((_, count)) => *count += weight,
                    None => counts.push((domain, weight)),
                }
            }
        }
        let mut best: Option<(&str, u32)> = None;
        for (domain, count) in counts {
            if best.map_or(true, |(_, best_count)| count > best_count) {
                best = Some((domain, count));
            }
        }
        match best {
            Some((domain, _)) => domain.to_string(),
            None => domains
                .first()
                .cloned()
                .unwrap_or_else(|| self.default_domain.clone()),
        }
    }
}
