// Job posting extraction prompt.
// {content} is replaced with the normalized posting text.

pub const JOB_EXTRACTION_PROMPT_TEMPLATE: &str = r#"You are a job posting analyzer with expert-level technical skill detection. Your most important task is to identify every technical skill the role needs.

Job posting content:
{content}

EXPLICIT SKILLS
Scan the entire posting for technical skills that are named, including:
- Programming languages: Python, JavaScript, Java, C++, C#, Go, Rust, PHP, Ruby, Swift, Kotlin
- Frontend: React, Angular, Vue, HTML, CSS, TypeScript, jQuery, Bootstrap, Tailwind
- Backend: Node.js, Django, Flask, Spring, Express, FastAPI, Laravel, Rails
- Databases: PostgreSQL, MySQL, MongoDB, Redis, Elasticsearch, Cassandra, DynamoDB
- Cloud/DevOps: AWS, Azure, GCP, Docker, Kubernetes, Jenkins, Terraform, Ansible
- Tools: Git, Linux, Nginx, Apache, Webpack, Babel, Jest, Pytest
- Data/AI: Pandas, NumPy, TensorFlow, PyTorch, Spark, Hadoop, Tableau, Power BI
- Mobile: iOS, Android, React Native, Flutter, Xamarin

IMPLIED SKILLS
Also include skills the role clearly implies:
- "Full Stack Developer" implies HTML, CSS, JavaScript, Git, REST APIs
- "Data Scientist" implies SQL, Python or R, Statistics, Machine Learning
- "DevOps Engineer" implies Linux, Bash, CI/CD, Monitoring
- "Frontend Developer" implies Responsive Design, Browser DevTools, NPM/Yarn
- Mentions of APIs imply REST, JSON, HTTP, Postman
- Mentions of databases imply SQL, Database Design
- Mentions of cloud imply Cloud Architecture, Networking

Return ONLY a JSON object with this structure:
{
  "role": "Job title",
  "company": "Company name",
  "location": "Job location (city, state, remote, etc.)",
  "description": "A concise 2-3 sentence summary of the role and its purpose",
  "responsibilities": "A brief paragraph summarizing key responsibilities",
  "skills": ["every technical skill, explicit and implied"],
  "qualifications": "A concise paragraph of required qualifications",
  "preferredQualifications": "A brief paragraph of nice-to-have qualifications",
  "education": "Education requirements",
  "experience": "Years of experience required",
  "benefits": "A brief paragraph of benefits and perks, if mentioned",
  "salary": "Salary range or compensation, if mentioned"
}

Rules:
- The skills array is the top priority.
- Include both explicitly named and logically implied skills.
- Use null for fields the posting does not mention.
- Return only the JSON object, no additional text."#;
