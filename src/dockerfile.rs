use std::fmt;

/// One Dockerfile instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    From(String),
    Workdir(String),
    Copy { src: String, dest: String },
    Run(String),
    Env { key: String, value: String },
    Expose(u16),
    /// Exec-form `CMD`.
    Cmd(Vec<String>),
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::From(image) => write!(f, "FROM {image}"),
            Self::Workdir(dir) => write!(f, "WORKDIR {dir}"),
            Self::Copy { src, dest } => write!(f, "COPY {src} {dest}"),
            Self::Run(cmd) => write!(f, "RUN {cmd}"),
            Self::Env { key, value } => write!(f, "ENV {key}={value}"),
            Self::Expose(port) => write!(f, "EXPOSE {port}"),
            Self::Cmd(argv) => {
                let quoted: Vec<String> = argv
                    .iter()
                    .map(|a| serde_json::Value::String(a.clone()).to_string())
                    .collect();
                write!(f, "CMD [{}]", quoted.join(", "))
            }
        }
    }
}

/// A Dockerfile assembled instruction by instruction.
///
/// # Example
///
/// ```
/// use vibes::dockerfile::Dockerfile;
///
/// let df = Dockerfile::new("node:20-alpine")
///     .workdir("/app")
///     .expose(3000);
///
/// assert_eq!(df.exposed_port(), Some(3000));
/// assert!(df.to_string().starts_with("FROM node:20-alpine\n"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dockerfile {
    pub instructions: Vec<Instruction>,
}

impl Dockerfile {
    #[must_use]
    pub fn new(image: &str) -> Self {
        Self {
            instructions: vec![Instruction::From(image.to_string())],
        }
    }

    #[must_use]
    pub fn workdir(self, dir: &str) -> Self {
        self.push(Instruction::Workdir(dir.to_string()))
    }

    #[must_use]
    pub fn copy(self, src: &str, dest: &str) -> Self {
        self.push(Instruction::Copy {
            src: src.to_string(),
            dest: dest.to_string(),
        })
    }

    #[must_use]
    pub fn run(self, cmd: &str) -> Self {
        self.push(Instruction::Run(cmd.to_string()))
    }

    #[must_use]
    pub fn env(self, key: &str, value: &str) -> Self {
        self.push(Instruction::Env {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    #[must_use]
    pub fn expose(self, port: u16) -> Self {
        self.push(Instruction::Expose(port))
    }

    /// `CMD ["sh", "-c", <command>]`.
    #[must_use]
    pub fn cmd_shell(self, command: &str) -> Self {
        self.push(Instruction::Cmd(vec![
            "sh".to_string(),
            "-c".to_string(),
            command.to_string(),
        ]))
    }

    #[must_use]
    pub fn exposed_port(&self) -> Option<u16> {
        self.instructions.iter().find_map(|i| match i {
            Instruction::Expose(port) => Some(*port),
            _ => None,
        })
    }

    #[must_use]
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.instructions.iter().find_map(|i| match i {
            Instruction::Env { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    fn push(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }
}

impl fmt::Display for Dockerfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instruction in &self.instructions {
            writeln!(f, "{instruction}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_in_order() {
        let df = Dockerfile::new("python:3.12-slim")
            .workdir("/app")
            .copy(".", ".")
            .run("pip install -r requirements.txt")
            .env("PORT", "8000")
            .expose(8000)
            .cmd_shell("python app.py");

        assert_eq!(
            df.to_string(),
            "FROM python:3.12-slim\n\
             WORKDIR /app\n\
             COPY . .\n\
             RUN pip install -r requirements.txt\n\
             ENV PORT=8000\n\
             EXPOSE 8000\n\
             CMD [\"sh\", \"-c\", \"python app.py\"]\n"
        );
    }

    #[test]
    fn cmd_escapes_quotes() {
        let df = Dockerfile::new("x").cmd_shell(r#"node -e "go()""#);

        assert!(df.to_string().contains(r#"CMD ["sh", "-c", "node -e \"go()\""]"#));
    }

    #[test]
    fn env_lookup() {
        let df = Dockerfile::new("x").env("PORT", "1").env("MODE", "prod");

        assert_eq!(df.env_value("MODE"), Some("prod"));
        assert_eq!(df.env_value("NOPE"), None);
    }
}
