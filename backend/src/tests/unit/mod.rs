mod automation_pipeline;
