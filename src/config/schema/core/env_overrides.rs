use super::Config;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("CONVOKIT_API_KEY")
            && !key.is_empty()
        {
            self.api_key = Some(key);
        }

        if let Ok(provider) = std::env::var("CONVOKIT_PROVIDER")
            && !provider.is_empty()
        {
            self.default_provider = Some(provider);
        }

        if let Ok(model) = std::env::var("CONVOKIT_MODEL")
            && !model.is_empty()
        {
            self.default_model = Some(model);
        }

        if let Ok(user_id) = std::env::var("CONVOKIT_USER_ID")
            && !user_id.is_empty()
        {
            self.identity.user_id = Some(user_id);
        }

        if let Ok(data_dir) = std::env::var("CONVOKIT_DATA_DIR")
            && !data_dir.is_empty()
        {
            self.storage.data_dir = data_dir;
        }

        if let Ok(max_str) = std::env::var("CONVOKIT_MAX_CONTEXT")
            && let Ok(max) = max_str.parse::<usize>()
            && max > 0
        {
            self.memory.max_context_size = max;
        }
    }
}
